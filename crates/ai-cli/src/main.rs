//! ai: web search, quick questions and long chats over an LLM gateway.

mod answer;
mod ask;
mod chat;
mod cleanup;
mod input;
mod prompts;
mod search;

use std::fs::OpenOptions;
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use ai_api::CompletionClient;
use ai_config::AppConfig;
use ai_terminal::style;
use ai_types::{AiError, ApiError, ConfigError};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ai", version, about = "Terminal assistant over an LLM gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show model parameters and enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Quick web search with a concise, sourced answer
    Search {
        /// What to search for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Ask a question, with up to two follow-ups
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Interactive chat, saved between runs
    Chat {
        /// Chat to load or create (a timestamped name by default)
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let client =
        CompletionClient::from_endpoints(&config.api_key, &config.endpoints, config.timeout)
            .context("Failed to create API client")?;

    match cli.command {
        Command::Search { query } => {
            search::run(&client, &config, &query.join(" "), cli.verbose).await
        }
        Command::Ask { question } => {
            ask::run(&client, &config, &question.join(" "), cli.verbose).await
        }
        Command::Chat { name } => chat::run(&client, &config, name, cli.verbose).await,
    }
}

/// Print the error with a category hint and pick the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    if is_interruption(err) {
        eprintln!("\n{}", style::warning("Interrupted"));
        return ExitCode::SUCCESS;
    }

    tracing::error!("{err:#}");
    eprintln!("{}", style::error(&format!("{err:#}")));

    let hint = err.chain().find_map(|cause| {
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return api.category().describe().map(str::to_string);
        }
        match cause.downcast_ref::<ConfigError>() {
            Some(ConfigError::Created { .. }) | Some(ConfigError::MissingKey { .. }) => Some(
                format!("Set {} or add proxyapi_key to the config file", ai_config::API_KEY_ENV),
            ),
            _ => None,
        }
    });
    if let Some(hint) = hint {
        eprintln!("{}", style::dim(&hint));
    }
    ExitCode::FAILURE
}

fn is_interruption(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<AiError>(), Some(AiError::Cancelled))
}

/// Log to `<data dir>/ai/ai.log` so records never mix with the rendered
/// answer. Falls back to stderr when the file cannot be opened.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},reqwest=warn,hyper=warn,hyper_util=warn"))
    });

    let log_dir = ai_config::data_dir();
    let file = std::fs::create_dir_all(&log_dir).and_then(|()| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("ai.log"))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(_) => builder.with_writer(io::stderr).init(),
    }
}

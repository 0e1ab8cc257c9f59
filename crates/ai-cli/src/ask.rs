//! `ai ask`: a question with a small, fixed number of follow-ups.

use ai_api::CompletionClient;
use ai_config::AppConfig;
use ai_terminal::style;
use ai_types::{AiError, CompletionRequest, Message};
use anyhow::{Context, Result};

use crate::answer;
use crate::cleanup::clean_answer;
use crate::input::LineReader;
use crate::prompts;

/// Answers per invocation, the first question included.
pub const MAX_EXCHANGES: usize = 3;

const TEMPERATURE: f32 = 0.4;
const MAX_TOKENS: u32 = 1500;

pub async fn run(
    client: &CompletionClient,
    config: &AppConfig,
    question: &str,
    verbose: bool,
) -> Result<()> {
    let mut messages = vec![Message::system(prompts::ASK), Message::user(question)];
    let mut input = LineReader::spawn().context("Failed to read stdin")?;

    for exchange in 0..MAX_EXCHANGES {
        let left = MAX_EXCHANGES - exchange;
        eprintln!(
            "{}\n",
            style::warning(&format!("Exchanges left: {left}/{MAX_EXCHANGES}"))
        );

        let request = CompletionRequest::new(config.models.ask.as_str(), messages.clone())
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_TOKENS);
        if verbose && exchange == 0 {
            answer::print_params(&request);
        }

        tracing::info!(model = %request.model, exchange, "Asking");
        let response = answer::fetch(client, request, "Thinking...")
            .await
            .context("Ask failed")?;
        let cleaned = clean_answer(&response);
        answer::print_markdown(&cleaned).context("Failed to write answer")?;
        messages.push(Message::assistant(cleaned));

        if left == 1 {
            eprintln!("\n{}", style::warning("Exchange limit reached"));
            break;
        }

        eprintln!();
        let prompt = style::prompt("Follow-up (Enter to finish)");
        let next = tokio::select! {
            line = input.read_line(&prompt) => line,
            _ = tokio::signal::ctrl_c() => return Err(AiError::Cancelled.into()),
        };
        match next {
            Some(line) if !line.trim().is_empty() => {
                messages.push(Message::user(line.trim()));
                eprintln!();
            }
            _ => break,
        }
    }
    Ok(())
}


//! `ai chat`: interactive, streamed chat with saved transcripts.

use std::io::{self, Write};

use ai_api::CompletionClient;
use ai_config::AppConfig;
use ai_session::{ChatSession, ChatStore, SessionError, generate_name, validate_name};
use ai_terminal::{ResponseRenderer, style};
use ai_types::{AiError, ApiError, CompletionRequest};
use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};

use crate::answer;
use crate::input::LineReader;
use crate::prompts;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4000;

pub async fn run(
    client: &CompletionClient,
    config: &AppConfig,
    name: Option<String>,
    verbose: bool,
) -> Result<()> {
    let store = ChatStore::new(config.chats_dir.clone())
        .await
        .with_context(|| format!("Failed to open {}", config.chats_dir.display()))?;
    let mut chat = open_chat(&store, name, &config.models.chat).await?;
    let mut input = LineReader::spawn().context("Failed to read stdin")?;

    eprintln!("{}", style::bold("ai chat"));
    eprintln!(
        "{}\n",
        style::dim("Commands: /new, /load, /list, /save, /exit, /help")
    );
    if verbose {
        answer::print_params(&turn_request(&chat));
    }

    let prompt = style::prompt("you");
    loop {
        let line = tokio::select! {
            line = input.read_line(&prompt) => line,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", style::warning("Interrupted. Use /exit to leave"));
                continue;
            }
        };
        let Some(line) = line else {
            eprintln!();
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('/') {
            match handle_slash_command(line, &mut chat, &store, &config.models.chat).await {
                SlashResult::Continue => continue,
                SlashResult::Break => break,
            }
        }

        chat.push_user(line);
        tracing::info!(chat = %chat.name, model = %chat.model, "Chat turn");
        println!("{}", style::bold("ai>"));

        let outcome = tokio::select! {
            result = stream_answer(client, &chat) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        match outcome {
            Some(Ok(text)) => chat.push_assistant(text),
            Some(Err(e)) => {
                chat.pop_unanswered();
                report_turn_error(&e);
            }
            None => {
                chat.pop_unanswered();
                eprintln!("\n{}", style::warning("Answer interrupted"));
            }
        }
        println!();
    }

    if !chat.messages.is_empty() {
        let path = store.save(&chat).await.context("Failed to save chat")?;
        eprintln!("{}", style::dim(&format!("Chat saved to {}", path.display())));
    }
    Ok(())
}

/// Load `name` if it was saved before, otherwise start a chat under that
/// name (or a timestamped one).
async fn open_chat(
    store: &ChatStore,
    name: Option<String>,
    default_model: &str,
) -> Result<ChatSession, SessionError> {
    let Some(name) = name else {
        let chat = ChatSession::new(generate_name(), default_model);
        eprintln!("{}", style::success(&format!("New chat: {}", chat.name)));
        return Ok(chat);
    };

    match store.load(&name).await {
        Ok(chat) => {
            eprintln!(
                "{}",
                style::success(&format!(
                    "Loaded chat: {} ({} messages)",
                    chat.name,
                    chat.messages.len()
                ))
            );
            Ok(chat)
        }
        Err(SessionError::NotFound { .. }) => {
            eprintln!(
                "{}",
                style::warning(&format!("Chat '{name}' not found, starting a new one"))
            );
            Ok(ChatSession::new(name, default_model))
        }
        Err(e) => Err(e),
    }
}

fn turn_request(chat: &ChatSession) -> CompletionRequest {
    CompletionRequest::new(chat.model.as_str(), chat.request_messages(prompts::CHAT))
        .with_temperature(TEMPERATURE)
        .with_max_tokens(MAX_TOKENS)
        .streaming(true)
}

/// Stream one answer to stdout, rendering markdown as lines complete.
async fn stream_answer(client: &CompletionClient, chat: &ChatSession) -> Result<String, AiError> {
    let fragments = client.complete(turn_request(chat));
    render_answer(fragments, ResponseRenderer::new(io::stdout())).await
}

/// Render fragments as they arrive and return the full text. An upstream
/// error wins over a failure to flush the partial answer.
async fn render_answer<S, W>(
    mut fragments: S,
    mut renderer: ResponseRenderer<W>,
) -> Result<String, AiError>
where
    S: Stream<Item = Result<String, ApiError>> + Unpin,
    W: Write,
{
    let mut text = String::new();

    while let Some(fragment) = fragments.next().await {
        let fragment = match fragment {
            Ok(fragment) => fragment,
            Err(e) => {
                if let Err(io_err) = renderer.finish() {
                    tracing::debug!("Failed to flush partial answer: {io_err}");
                }
                return Err(e.into());
            }
        };
        renderer.push(&fragment)?;
        text.push_str(&fragment);
    }
    renderer.finish()?;
    Ok(text)
}

fn report_turn_error(err: &AiError) {
    tracing::error!("Chat turn failed: {err}");
    eprintln!("\n{}", style::error(&err.to_string()));
    if let AiError::Api(api) = err {
        if let Some(hint) = api.category().describe() {
            eprintln!("{}", style::dim(hint));
        }
    }
}

enum SlashResult {
    Continue,
    Break,
}

async fn handle_slash_command(
    input: &str,
    chat: &mut ChatSession,
    store: &ChatStore,
    default_model: &str,
) -> SlashResult {
    let (cmd, arg) = match input.split_once(' ') {
        Some((c, a)) => (c, Some(a.trim()).filter(|a| !a.is_empty())),
        None => (input, None),
    };

    match cmd {
        "/exit" | "/quit" => return SlashResult::Break,
        "/help" => print_help(),
        "/save" => match store.save(chat).await {
            Ok(path) => eprintln!(
                "{}",
                style::success(&format!("Chat saved: {}", path.display()))
            ),
            Err(e) => eprintln!("{}", style::error(&format!("Failed to save chat: {e}"))),
        },
        "/new" => handle_new(chat, store, default_model, arg).await,
        "/load" => match arg {
            Some(name) => handle_load(chat, store, name).await,
            None => eprintln!("{}", style::error("Usage: /load <name>")),
        },
        "/list" => handle_list(store, &chat.name).await,
        _ => eprintln!(
            "{}",
            style::error(&format!(
                "Unknown command: {cmd}. Type /help for available commands."
            ))
        ),
    }
    eprintln!();
    SlashResult::Continue
}

/// Save the current chat before switching away from it.
async fn save_before_switch(chat: &ChatSession, store: &ChatStore) {
    if chat.messages.is_empty() {
        return;
    }
    if let Err(e) = store.save(chat).await {
        eprintln!(
            "{}",
            style::warning(&format!("Failed to save chat '{}': {e}", chat.name))
        );
    }
}

async fn handle_new(
    chat: &mut ChatSession,
    store: &ChatStore,
    default_model: &str,
    name: Option<&str>,
) {
    let name = match name {
        Some(name) => {
            if let Err(e) = validate_name(name) {
                eprintln!("{}", style::error(&e.to_string()));
                return;
            }
            if matches!(store.exists(name).await, Ok(true)) {
                eprintln!(
                    "{}",
                    style::error(&format!("Chat '{name}' already exists; use /load {name}"))
                );
                return;
            }
            name.to_string()
        }
        None => generate_name(),
    };

    save_before_switch(chat, store).await;
    *chat = ChatSession::new(name, default_model);
    eprintln!("{}", style::success(&format!("New chat: {}", chat.name)));
}

async fn handle_load(chat: &mut ChatSession, store: &ChatStore, name: &str) {
    match store.load(name).await {
        Ok(loaded) => {
            save_before_switch(chat, store).await;
            eprintln!(
                "{}",
                style::success(&format!(
                    "Loaded chat: {} ({} messages)",
                    loaded.name,
                    loaded.messages.len()
                ))
            );
            *chat = loaded;
        }
        Err(SessionError::NotFound { .. }) => {
            eprintln!("{}", style::error(&format!("Chat '{name}' not found")));
        }
        Err(e) => eprintln!("{}", style::error(&format!("Failed to load chat: {e}"))),
    }
}

async fn handle_list(store: &ChatStore, current: &str) {
    let summaries = match store.list().await {
        Ok(summaries) => summaries,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Failed to list chats: {e}")));
            return;
        }
    };
    if summaries.is_empty() {
        eprintln!("{}", style::warning("No saved chats"));
        return;
    }

    eprintln!("{}", style::bold("Saved chats:"));
    let mut stderr = io::stderr();
    for s in &summaries {
        let marker = if s.name == current { "*" } else { " " };
        let preview = if s.preview.is_empty() {
            "(empty)"
        } else {
            &s.preview
        };
        let _ = writeln!(
            stderr,
            "{marker} {}  {}  {:>3} msgs  {}  {}",
            s.name,
            style::dim(&s.created_local()),
            s.message_count,
            s.model,
            style::dim(preview)
        );
    }
}

fn print_help() {
    eprintln!("Available commands:");
    eprintln!("  /new [name]   Start a new chat (saves the current one)");
    eprintln!("  /load <name>  Load a saved chat");
    eprintln!("  /list         List saved chats");
    eprintln!("  /save         Save the current chat");
    eprintln!("  /exit, /quit  Save and leave");
    eprintln!("  /help         Show this help");
    eprintln!();
    eprintln!("Ctrl+C stops the current answer. Ctrl+D saves and leaves.");
}

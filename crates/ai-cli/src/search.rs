//! `ai search`: one-shot web search.

use ai_api::CompletionClient;
use ai_config::AppConfig;
use ai_terminal::style;
use ai_types::{CompletionRequest, Message};
use anyhow::{Context, Result};

use crate::answer;
use crate::cleanup::clean_answer;
use crate::prompts;

const TEMPERATURE: f32 = 0.3;

pub async fn run(
    client: &CompletionClient,
    config: &AppConfig,
    query: &str,
    verbose: bool,
) -> Result<()> {
    eprintln!("{}\n", style::bold(&format!("Search: {query}")));

    let request = CompletionRequest::new(
        config.models.search.as_str(),
        vec![Message::system(prompts::SEARCH), Message::user(query)],
    )
    .with_temperature(TEMPERATURE);
    if verbose {
        answer::print_params(&request);
    }

    tracing::info!(model = %request.model, "Running search");
    let response = answer::fetch(client, request, "Searching...")
        .await
        .context("Search failed")?;
    answer::print_markdown(&clean_answer(&response)).context("Failed to write answer")?;

    if verbose {
        eprintln!("\n{}", style::dim("Search completed"));
    }
    Ok(())
}

//! Helpers shared by the non-streaming commands.

use std::io;

use ai_api::CompletionClient;
use ai_terminal::{ResponseRenderer, Spinner, style};
use ai_types::{AiError, CompletionRequest};

/// Wait for the full answer behind a spinner. Ctrl+C abandons the request
/// and surfaces as [`AiError::Cancelled`].
pub async fn fetch(
    client: &CompletionClient,
    request: CompletionRequest,
    waiting: &str,
) -> Result<String, AiError> {
    let spinner = Spinner::start(waiting);
    let result = tokio::select! {
        result = client.complete_text(request) => result.map_err(AiError::from),
        _ = tokio::signal::ctrl_c() => Err(AiError::Cancelled),
    };
    spinner.stop().await;
    result
}

/// Render a complete answer as markdown on stdout.
pub fn print_markdown(text: &str) -> io::Result<()> {
    let mut renderer = ResponseRenderer::new(io::stdout());
    renderer.render_all(text)
}

/// Dimmed request parameters, shown with `--verbose`.
pub fn print_params(request: &CompletionRequest) {
    eprintln!("{}", style::dim(&format!("Model: {}", request.model)));
    if let Some(temperature) = request.temperature {
        eprintln!("{}", style::dim(&format!("Temperature: {temperature}")));
    }
    if let Some(max_tokens) = request.max_tokens {
        eprintln!("{}", style::dim(&format!("Max tokens: {max_tokens}")));
    }
    eprintln!();
}

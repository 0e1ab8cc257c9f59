//! Braille spinner shown on stderr while a non-streaming answer is pending.

use std::io::{IsTerminal, Write};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Braille animation frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// A spinner animated by a background tokio task.
///
/// Nothing is drawn when stderr is not a terminal, so redirected output
/// stays clean. Call [`stop`](Self::stop) before printing the answer.
pub struct Spinner {
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message.
    pub fn start(message: &str) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self { handle: None };
        }

        let text = message.to_string();
        let handle = tokio::spawn(async move {
            for frame in FRAMES.iter().cycle() {
                let mut stderr = std::io::stderr();
                let _ = write!(stderr, "\r\x1b[2K{frame} {text}");
                let _ = stderr.flush();
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Stop the animation and clear its line.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            clear_line();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            clear_line();
        }
    }
}

/// Clear the current line on stderr.
pub fn clear_line() {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r\x1b[2K");
    let _ = stderr.flush();
}

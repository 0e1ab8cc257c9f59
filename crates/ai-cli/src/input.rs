//! Line input from stdin.
//!
//! Lines are read on a dedicated thread and handed over through a channel,
//! so a pending read never blocks the runtime and can be raced against
//! Ctrl+C with `tokio::select!`.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;

pub struct LineReader {
    rx: mpsc::UnboundedReceiver<String>,
}

impl LineReader {
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("ai-stdin".into())
            .spawn(move || {
                let stdin = io::stdin();
                let mut lock = stdin.lock();
                loop {
                    let mut line = String::new();
                    match lock.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to read stdin: {e}");
                            break;
                        }
                    }
                }
            })?;
        Ok(Self { rx })
    }

    /// Show `prompt` on stderr and wait for the next line, without its line
    /// ending. `None` means stdin reached EOF.
    pub async fn read_line(&mut self, prompt: &str) -> Option<String> {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{prompt}");
        let _ = stderr.flush();
        let line = self.rx.recv().await?;
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

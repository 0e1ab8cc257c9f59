//! Streaming bridge: runs a blocking, callback-based producer on a dedicated
//! OS thread and re-exposes its output as an async [`FragmentStream`].
//!
//! The producer pushes [`StreamSignal`]s into an unbounded channel. The
//! consumer pops them with a short timeout so it can notice a worker that
//! exited without a terminal signal. Every termination path joins the worker
//! (bounded by [`BridgeConfig::join_timeout`]) before the end of the stream
//! is reported.

use std::any::Any;
use std::thread::JoinHandle;
use std::time::Duration;

use ai_types::{ApiError, FragmentStream};
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// Interval between liveness checks while joining the worker.
const JOIN_POLL: Duration = Duration::from_millis(10);

/// Timing knobs for the bridge.
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    /// How long the consumer waits on the channel before checking whether
    /// the worker is still alive.
    pub poll_interval: Duration,
    /// Upper bound on waiting for the worker thread at shutdown. After this
    /// the thread is abandoned.
    pub join_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Items crossing the thread boundary. `Done` is sent exactly once and last.
#[derive(Debug)]
pub enum StreamSignal {
    Data(String),
    Error(ApiError),
    Done,
}

/// Sends `Done` when dropped, so it is delivered on return and on unwind.
struct DoneGuard {
    tx: UnboundedSender<StreamSignal>,
}

impl DoneGuard {
    fn send(&self, signal: StreamSignal) {
        // The consumer may be gone; the signal is discarded then.
        let _ = self.tx.send(signal);
    }
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.send(StreamSignal::Done);
    }
}

/// Run `producer` on a new thread and stream the fragments it emits.
///
/// The producer receives an `emit` callback and returns once its upstream
/// call has finished. An `Err` return becomes the stream's final item; a
/// panic surfaces as [`ApiError::Worker`].
pub fn spawn_stream<F>(config: BridgeConfig, producer: F) -> FragmentStream
where
    F: FnOnce(&mut dyn FnMut(String)) -> Result<(), ApiError> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let spawned = std::thread::Builder::new()
        .name("ai-stream-worker".into())
        .spawn(move || {
            let guard = DoneGuard { tx };
            let result = {
                let mut emit = |fragment: String| guard.send(StreamSignal::Data(fragment));
                producer(&mut emit)
            };
            if let Err(e) = result {
                guard.send(StreamSignal::Error(e));
            }
        });

    let worker = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to spawn stream worker: {e}");
            let err = ApiError::Worker(format!("failed to spawn thread: {e}"));
            return Box::pin(stream::once(async move { Err(err) }).fuse());
        }
    };

    let receiver = BridgeReceiver {
        rx,
        worker: Some(worker),
        config,
        error_seen: false,
    };

    let fragments = stream::unfold(Some(receiver), |state| async move {
        let mut receiver = state?;
        match receiver.next_signal().await {
            Some(StreamSignal::Data(text)) => Some((Ok(text), Some(receiver))),
            Some(StreamSignal::Error(e)) => {
                receiver.error_seen = true;
                receiver.shutdown().await;
                Some((Err(e), None))
            }
            Some(StreamSignal::Done) | None => {
                receiver.shutdown().await.map(|e| (Err(e), None))
            }
        }
    });

    Box::pin(fragments.fuse())
}

/// Consumer half of the bridge. Owns the worker handle until shutdown.
struct BridgeReceiver {
    rx: UnboundedReceiver<StreamSignal>,
    worker: Option<JoinHandle<()>>,
    config: BridgeConfig,
    error_seen: bool,
}

impl BridgeReceiver {
    /// Next signal, or `None` once the producer side is gone.
    async fn next_signal(&mut self) -> Option<StreamSignal> {
        loop {
            match tokio::time::timeout(self.config.poll_interval, self.rx.recv()).await {
                Ok(signal) => return signal,
                Err(_) => {
                    let exited = self.worker.as_ref().is_none_or(|h| h.is_finished());
                    if exited {
                        // Drain anything sent before the thread exited.
                        return self.rx.try_recv().ok();
                    }
                }
            }
        }
    }

    /// Join the worker within the configured window. Returns the error to
    /// report if the worker panicked and nothing was reported yet.
    async fn shutdown(&mut self) -> Option<ApiError> {
        self.rx.close();
        let handle = self.worker.take()?;
        match bounded_join(handle, self.config.join_timeout).await {
            JoinOutcome::Clean | JoinOutcome::Abandoned => None,
            JoinOutcome::Panicked(msg) if !self.error_seen => {
                tracing::error!("Stream worker panicked: {msg}");
                Some(ApiError::Worker(msg))
            }
            JoinOutcome::Panicked(msg) => {
                tracing::warn!("Stream worker panicked after reporting an error: {msg}");
                None
            }
        }
    }
}

impl Drop for BridgeReceiver {
    fn drop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.rx.close();

        if handle.is_finished() {
            let _ = handle.join();
            return;
        }

        let join_timeout = self.config.join_timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!("Stream dropped early; reaping worker in background");
                runtime.spawn(async move {
                    bounded_join(handle, join_timeout).await;
                });
            }
            Err(_) => {
                tracing::warn!("Stream dropped outside a runtime; detaching worker thread");
            }
        }
    }
}

enum JoinOutcome {
    Clean,
    Panicked(String),
    Abandoned,
}

/// Wait for `handle` without blocking the runtime, giving up after `limit`.
async fn bounded_join(handle: JoinHandle<()>, limit: Duration) -> JoinOutcome {
    let deadline = Instant::now() + limit;
    while !handle.is_finished() {
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                timeout_ms = limit.as_millis() as u64,
                "Stream worker did not exit in time; abandoning thread"
            );
            return JoinOutcome::Abandoned;
        }
        tokio::time::sleep(JOIN_POLL.min(deadline - now)).await;
    }

    match handle.join() {
        Ok(()) => JoinOutcome::Clean,
        Err(payload) => JoinOutcome::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker thread panicked".to_string()
    }
}

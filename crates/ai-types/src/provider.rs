//! Provider traits for the two upstream protocol shapes.

use crate::{ApiError, ChatRequest, NativeRequest};
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;

/// A boxed async stream of text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// A boxed future returned by [`ChatProvider`] methods.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// An OpenAI-compatible provider with a native async interface.
///
/// Dyn-compatible so the façade can hold `Arc<dyn ChatProvider>`.
pub trait ChatProvider: Send + Sync {
    /// Open a streaming chat completion, yielding non-empty content deltas.
    fn stream_chat<'a>(&'a self, request: &'a ChatRequest) -> ProviderFuture<'a, FragmentStream>;

    /// Perform a single-shot chat completion and return the full text.
    fn complete_chat<'a>(&'a self, request: &'a ChatRequest) -> ProviderFuture<'a, String>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// A provider whose native interface is blocking and thread-bound.
///
/// Calls block the current thread until the response ends, so they must run
/// on a dedicated thread or the blocking pool, never on an async worker.
pub trait NativeProvider: Send + Sync {
    /// Stream a response, calling `on_text` once per text delta in emission
    /// order. Returns when the stream ends or fails.
    fn stream_text(
        &self,
        request: &NativeRequest,
        on_text: &mut dyn FnMut(String),
    ) -> Result<(), ApiError>;

    /// Perform a single-shot request and return the full text.
    fn create_text(&self, request: &NativeRequest) -> Result<String, ApiError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

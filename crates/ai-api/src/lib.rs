//! Gateway client for ai: model routing, the streaming bridge, the unified
//! completion façade and the HTTP clients behind it.

pub mod bridge;
pub mod router;
pub mod translate;

mod aggregate;
mod compat;
mod completion;
mod http;
mod native;
mod sse;

pub use aggregate::aggregate;
pub use bridge::{BridgeConfig, StreamSignal, spawn_stream};
pub use compat::{ChatChunkStream, DEFAULT_COMPAT_TIMEOUT, OpenAiCompatClient};
pub use completion::{CompletionClient, DEFAULT_FALLBACK_MODELS};
pub use native::{DEFAULT_NATIVE_TIMEOUT, NativeClient};
pub use router::{Endpoints, ProviderFamily};
pub use sse::{SseEvent, SseParser};

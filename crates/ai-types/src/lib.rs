//! Shared types and error hierarchy for ai.

pub mod error;
pub mod message;
pub mod provider;

pub use error::{AiError, ApiError, ConfigError, ErrorCategory};
pub use message::*;
pub use provider::{ChatProvider, FragmentStream, NativeProvider, ProviderFuture};

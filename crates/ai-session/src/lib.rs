//! Chat transcript persistence for ai.

pub mod error;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use store::ChatStore;
pub use types::{ChatSession, ChatSummary, generate_name, validate_name};

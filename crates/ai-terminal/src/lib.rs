//! Terminal output for ai: streaming markdown, code highlighting, spinner
//! and status styles.

pub mod highlight;
pub mod markdown;
pub mod spinner;
pub mod style;

pub use markdown::{ResponseRenderer, render_inline};
pub use spinner::Spinner;

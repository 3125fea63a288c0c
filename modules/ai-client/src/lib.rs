//! Thin chat clients for the assistants whose citations we track.
//!
//! Each backend exposes exactly one call: a single web-search-enabled chat
//! turn. Responses come back as raw JSON because the citation shape differs
//! per backend (and per model generation); interpretation lives with the
//! caller.

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod util;

pub use claude::Claude;
pub use gemini::Gemini;
pub use openai::OpenAi;

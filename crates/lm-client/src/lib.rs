//! `lm-client`: blocking client for a hosted language-model completion API.
//!
//! Speaks the `generateContent` REST protocol: one prompt in, the text of
//! the first candidate out. `seo-agent` uses it as the fallback report
//! parser when the deterministic grammar finds nothing.
//!
//! ```rust,ignore
//! use lm_client::LmClient;
//!
//! let client = LmClient::new("https://generativelanguage.googleapis.com", "gemini-1.5-flash", key);
//! let text = client.complete("Extract the actions as JSON.")?;
//! ```

pub mod client;
pub mod error;
pub mod types;


pub use client::LmClient;
pub use error::LmError;
pub use types::{Candidate, Content, GenerateRequest, GenerateResponse, GenerationConfig, Part};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LmError>;

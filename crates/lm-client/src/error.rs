use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response has no text candidate")]
    Empty,

    #[error("API key not set: export {0}")]
    MissingKey(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Blank user input. The controller drops these before they reach the store.
    #[error("message text is blank")]
    Validation,

    #[error("completion endpoint returned HTTP {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The body is not JSON, or has no `choices` at all
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;

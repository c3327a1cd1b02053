//! Error types for igr-instagram

use thiserror::Error;

/// igr-instagram error type
#[derive(Error, Debug)]
pub enum InstagramError {
    /// The session was rejected and a fresh login is needed
    #[error("Instagram login required")]
    LoginRequired,

    /// The provider asked us to slow down
    #[error("Instagram rate limited: {0}")]
    RateLimited(String),

    #[error("Direct thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Instagram API error: {0}")]
    Api(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, InstagramError>;

//! Error types for igr-core

use thiserror::Error;

/// Main error type for igr-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for igr-core
pub type Result<T> = std::result::Result<T, Error>;

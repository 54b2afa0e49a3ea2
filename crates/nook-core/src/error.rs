//! Error types for nook-core

use thiserror::Error;

use crate::api::ApiError;
use crate::session::SessionError;

/// Result type alias using nook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Session token error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation requires a signed-in user
    #[error("Not signed in")]
    NotAuthenticated,
}

//! Common error types for the notebook services

use thiserror::Error;

/// Common result type for notebook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Closed error taxonomy shared by every notebook component.
///
/// The first five variants are the domain failures callers match on.
/// `Config` and `Io` only arise while a service is starting up.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete course content. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store transaction failure; the transaction has been rolled back
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Referenced course, module, file or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to act on the resource
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// AI gateway or object store failure
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a stored value that failed to decode as a persistence failure
    pub fn decode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Persistence(sqlx::Error::Decode(Box::new(err)))
    }
}

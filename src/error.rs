//! Error types for the persistence layer and session controllers

use thiserror::Error;

/// Errors surfaced by the store, repositories and sessions
#[derive(Error, Debug)]
pub enum Error {
    /// Constraint violation or I/O failure at the store
    #[error("storage error: {0}")]
    Storage(String),

    /// Update or delete referencing a missing row
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Audio asset file could not be opened, written or removed
    #[error("asset I/O error: {0}")]
    AssetIo(#[from] std::io::Error),

    /// No location fix could be obtained
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// A required capture or location permission is missing
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Error::AssetIo(io),
            other => Error::AssetIo(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

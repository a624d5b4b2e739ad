//! Error taxonomy for catalog operations.
//!
//! Every variant describes a recoverable condition: validation errors ask the
//! user to retry, camera errors return the capture pipeline to idle, and
//! storage errors leave the in-memory collection untouched. Stored payloads
//! that fail to parse never reach this type; they are recovered as an empty
//! collection by the storage layer.

use thiserror::Error;

/// Result alias used across the crate.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Shelf name is empty once trimmed.
    #[error("Shelf name must not be empty")]
    InvalidName,

    /// Commit attempted without a cropped image.
    #[error("Image missing")]
    MissingImage,

    /// Permission denied, no device, or the frame could not be grabbed.
    #[error("Camera not available: {0}")]
    CameraUnavailable(String),

    /// The referenced shelf is not part of the collection.
    #[error("No shelf named '{0}'")]
    UnknownShelf(String),

    /// The referenced book id is not on the given shelf.
    #[error("No book {1} on shelf '{0}'")]
    UnknownBook(String, u64),

    /// A capture step was requested in a state that does not accept it,
    /// such as starting a second capture while one is active.
    #[error("Capture step not allowed: {0}")]
    InvalidCaptureStep(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CatalogError {
    /// True for errors the user fixes by re-entering input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, CatalogError::InvalidName | CatalogError::MissingImage)
    }
}

impl From<lmdb::Error> for CatalogError {
    fn from(err: lmdb::Error) -> Self {
        CatalogError::Storage(format!("LMDB error: {err}"))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(format!("JSON serialization error: {err}"))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Storage(format!("IO error: {err}"))
    }
}

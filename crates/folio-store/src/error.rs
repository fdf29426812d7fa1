use std::path::PathBuf;

use folio_types::TypeError;

/// Errors from filesystem and codec operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path the operation requires does not exist.
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The destination of a copy or rename is already occupied.
    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Stored text is not a valid front-matter document.
    #[error("cannot decode document: {0}")]
    Decode(String),

    /// Fields cannot be rendered as a front-matter document.
    #[error("cannot encode document: {0}")]
    Encode(String),

    /// The entry id is malformed or escapes the storage root.
    #[error(transparent)]
    InvalidId(#[from] TypeError),

    /// A temporary file could not be moved into place.
    #[error("atomic write to {} failed: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

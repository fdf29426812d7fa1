/// Errors from cache backends.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error from the cache directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cached value could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The atomic publish of a cache file failed.
    #[error("store error: {0}")]
    Store(#[from] folio_store::StoreError),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

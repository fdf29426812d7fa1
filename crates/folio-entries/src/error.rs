use thiserror::Error;

/// Errors surfaced by the entry repository.
///
/// Missing or duplicate ids are not errors; CRUD operations report them as
/// `Ok(false)` and fetches return empty results. What remains here are the
/// faults a caller cannot branch around.
#[derive(Debug, Error)]
pub enum EntriesError {
    #[error("store error: {0}")]
    Store(#[from] folio_store::StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] folio_cache::CacheError),

    #[error("invalid entry id: {0}")]
    InvalidId(#[from] folio_types::TypeError),

    /// The stored document for an entry could not be decoded.
    #[error("entry {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A lifecycle hook failed; the operation was aborted before writing.
    #[error("hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A registered operation reported a failure.
    #[error("operation '{name}' failed: {message}")]
    Operation { name: String, message: String },
}

impl EntriesError {
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    pub fn operation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type EntriesResult<T> = Result<T, EntriesError>;

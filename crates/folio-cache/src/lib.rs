//! Fetch cache for folio.
//!
//! Cache entries are keyed on `(id, operation kind, fingerprint)` where the
//! fingerprint is a domain-separated BLAKE3 digest of the document's
//! modification time and size. There is no time-based expiry: when the
//! document changes, its fingerprint changes and old entries are unreachable.
//!
//! - [`Cache`] -- the layer the repository talks to, with the enable flag
//! - [`CacheBackend`] -- storage seam; [`MemoryCache`] and [`FileCache`]
//! - [`Fingerprinter`] / [`Fingerprint`] -- 16-byte (32 hex char) ids

pub mod backend;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod layer;

pub use backend::{CacheBackend, FileCache, MemoryCache};
pub use error::{CacheError, CacheResult};
pub use fingerprint::{Fingerprint, Fingerprinter, FINGERPRINT_LEN};
pub use key::{CacheKey, OperationKind};
pub use layer::{Cache, CacheStats};

use std::path::Path;
use std::time::SystemTime;

use crate::error::StoreResult;

/// Modification state of a stored file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStamp {
    /// Last modification time reported by the backend.
    pub modified: SystemTime,
    /// Size of the file in bytes.
    pub len: u64,
}

impl FileStamp {
    /// Modification time as whole seconds since the Unix epoch.
    pub fn modified_secs(&self) -> i64 {
        match self.modified.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }

    /// Modification time as nanoseconds since the Unix epoch.
    pub fn modified_nanos(&self) -> u128 {
        self.modified
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    }
}

/// Substitutable backing store for entry documents.
///
/// All implementations must satisfy these invariants:
/// - `write` is atomic: readers observe either the old or the new contents,
///   never a partial file, and missing parent directories are created.
/// - `copy_tree` and `rename` refuse to overwrite an existing destination.
/// - Absent paths are reported through `Ok(None)` / `Ok(false)`, never as
///   errors. Only real I/O faults are errors.
pub trait Filesystem: Send + Sync {
    /// Read a file as UTF-8 text. Returns `Ok(None)` if it does not exist.
    fn read(&self, path: &Path) -> StoreResult<Option<String>>;

    /// Atomically create or replace a file.
    fn write(&self, path: &Path, contents: &str) -> StoreResult<()>;

    /// Check whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> StoreResult<bool>;

    /// Delete a file, or a directory with its whole subtree.
    ///
    /// Returns `true` if something was removed.
    fn delete(&self, path: &Path) -> StoreResult<bool>;

    /// Names of the direct child directories of `dir`, sorted.
    ///
    /// A missing directory has no children.
    fn list_children(&self, dir: &Path) -> StoreResult<Vec<String>>;

    /// Modification state of a file, or `None` if it does not exist.
    fn stamp(&self, path: &Path) -> StoreResult<Option<FileStamp>>;

    /// Recursively duplicate the directory at `from` to `to`.
    fn copy_tree(&self, from: &Path, to: &Path) -> StoreResult<()>;

    /// Move the file or directory at `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> StoreResult<()>;
}

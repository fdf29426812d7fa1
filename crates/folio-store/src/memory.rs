use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use crate::error::{StoreError, StoreResult};
use crate::traits::{FileStamp, Filesystem};

#[derive(Clone, Debug)]
struct MemFile {
    contents: String,
    modified: SystemTime,
}

#[derive(Default)]
struct Tree {
    files: BTreeMap<PathBuf, MemFile>,
    dirs: BTreeSet<PathBuf>,
    /// Logical clock; every write advances it by one nanosecond.
    clock: u64,
}

impl Tree {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000) + Duration::from_nanos(self.clock)
    }

    fn add_ancestors(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || !self.dirs.insert(dir.to_path_buf()) {
                break;
            }
            current = dir.parent();
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }
}

/// Re-root `path` from under `from` to under `to`.
fn rebase(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    let rest = path.strip_prefix(from).ok()?;
    if rest.as_os_str().is_empty() {
        Some(to.to_path_buf())
    } else {
        Some(to.join(rest))
    }
}

/// In-memory filesystem.
///
/// Intended for tests and embedding. Modification times come from a
/// logical clock, so every write produces a strictly newer stamp and
/// fingerprints change deterministically.
pub struct InMemoryFilesystem {
    tree: RwLock<Tree>,
}

impl InMemoryFilesystem {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree::default()),
        }
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.tree.read().expect("lock poisoned").files.len()
    }

}

impl Default for InMemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for InMemoryFilesystem {
    fn read(&self, path: &Path) -> StoreResult<Option<String>> {
        let tree = self.tree.read().expect("lock poisoned");
        Ok(tree.files.get(path).map(|f| f.contents.clone()))
    }

    fn write(&self, path: &Path, contents: &str) -> StoreResult<()> {
        let mut tree = self.tree.write().expect("lock poisoned");
        let modified = tree.tick();
        tree.add_ancestors(path);
        tree.files.insert(
            path.to_path_buf(),
            MemFile {
                contents: contents.to_string(),
                modified,
            },
        );
        Ok(())
    }

    fn exists(&self, path: &Path) -> StoreResult<bool> {
        Ok(self.tree.read().expect("lock poisoned").exists(path))
    }

    fn delete(&self, path: &Path) -> StoreResult<bool> {
        let mut tree = self.tree.write().expect("lock poisoned");
        if tree.files.remove(path).is_some() {
            return Ok(true);
        }
        if !tree.dirs.remove(path) {
            return Ok(false);
        }
        tree.files.retain(|p, _| !p.starts_with(path));
        tree.dirs.retain(|p| !p.starts_with(path));
        Ok(true)
    }

    fn list_children(&self, dir: &Path) -> StoreResult<Vec<String>> {
        let tree = self.tree.read().expect("lock poisoned");
        Ok(tree
            .dirs
            .iter()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }

    fn stamp(&self, path: &Path) -> StoreResult<Option<FileStamp>> {
        let tree = self.tree.read().expect("lock poisoned");
        Ok(tree.files.get(path).map(|f| FileStamp {
            modified: f.modified,
            len: f.contents.len() as u64,
        }))
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> StoreResult<()> {
        let mut tree = self.tree.write().expect("lock poisoned");
        if !tree.dirs.contains(from) {
            return Err(StoreError::NotFound(from.to_path_buf()));
        }
        if tree.exists(to) {
            return Err(StoreError::AlreadyExists(to.to_path_buf()));
        }

        let dirs: Vec<PathBuf> = tree
            .dirs
            .iter()
            .filter(|p| p.starts_with(from))
            .filter_map(|p| rebase(p, from, to))
            .collect();
        let files: Vec<(PathBuf, String)> = tree
            .files
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .filter_map(|(p, f)| rebase(p, from, to).map(|dest| (dest, f.contents.clone())))
            .collect();

        tree.add_ancestors(to);
        tree.dirs.extend(dirs);
        for (path, contents) in files {
            let modified = tree.tick();
            tree.files.insert(path, MemFile { contents, modified });
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> StoreResult<()> {
        let mut tree = self.tree.write().expect("lock poisoned");
        if !tree.exists(from) {
            return Err(StoreError::NotFound(from.to_path_buf()));
        }
        if tree.exists(to) {
            return Err(StoreError::AlreadyExists(to.to_path_buf()));
        }

        let moved_files: Vec<(PathBuf, PathBuf)> = tree
            .files
            .keys()
            .filter(|p| p.starts_with(from))
            .filter_map(|p| rebase(p, from, to).map(|dest| (p.clone(), dest)))
            .collect();
        let moved_dirs: Vec<(PathBuf, PathBuf)> = tree
            .dirs
            .iter()
            .filter(|p| p.starts_with(from))
            .filter_map(|p| rebase(p, from, to).map(|dest| (p.clone(), dest)))
            .collect();

        tree.add_ancestors(to);
        for (old, new) in moved_files {
            if let Some(file) = tree.files.remove(&old) {
                tree.files.insert(new, file);
            }
        }
        for (old, new) in moved_dirs {
            tree.dirs.remove(&old);
            tree.dirs.insert(new);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryFilesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFilesystem")
            .field("file_count", &self.file_count())
            .finish()
    }
}

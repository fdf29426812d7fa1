use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::{FileStamp, Filesystem};

/// Filesystem backed by the local disk.
///
/// Writes go to a temporary file in the destination directory which is then
/// renamed over the target, so a crash never leaves a torn document behind.
#[derive(Clone, Debug, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

/// Write `contents` to `path` through a sibling temp file and an atomic rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Persist {
        path: path.to_path_buf(),
        reason: e.error.to_string(),
    })?;
    Ok(())
}

fn not_found_as_none<T>(result: io::Result<T>) -> StoreResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn copy_walk(from: &Path, to: &Path) -> StoreResult<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| StoreError::Io(io::Error::other(e)))?;
        let dest: PathBuf = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

impl Filesystem for LocalFilesystem {
    fn read(&self, path: &Path) -> StoreResult<Option<String>> {
        not_found_as_none(fs::read_to_string(path))
    }

    fn write(&self, path: &Path, contents: &str) -> StoreResult<()> {
        write_atomic(path, contents.as_bytes())?;
        debug!(path = %path.display(), len = contents.len(), "wrote file");
        Ok(())
    }

    fn exists(&self, path: &Path) -> StoreResult<bool> {
        Ok(path.try_exists()?)
    }

    fn delete(&self, path: &Path) -> StoreResult<bool> {
        let Some(meta) = not_found_as_none(fs::symlink_metadata(path))? else {
            return Ok(false);
        };
        if meta.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(true)
    }

    fn list_children(&self, dir: &Path) -> StoreResult<Vec<String>> {
        let Some(entries) = not_found_as_none(fs::read_dir(dir))? else {
            return Ok(Vec::new());
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn stamp(&self, path: &Path) -> StoreResult<Option<FileStamp>> {
        let Some(meta) = not_found_as_none(fs::metadata(path))? else {
            return Ok(None);
        };
        Ok(Some(FileStamp {
            modified: meta.modified()?,
            len: meta.len(),
        }))
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> StoreResult<()> {
        if !from.is_dir() {
            return Err(StoreError::NotFound(from.to_path_buf()));
        }
        if to.try_exists()? {
            return Err(StoreError::AlreadyExists(to.to_path_buf()));
        }

        let parent = to
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        // Stage beside the target, then rename into place. A failure part-way
        // leaves nothing at `to`; `staging` is removed on drop.
        let staging = tempfile::Builder::new()
            .prefix(".folio-copy-")
            .tempdir_in(parent)?;
        let tree = staging.path().join("tree");
        copy_walk(from, &tree)?;
        fs::rename(&tree, to)?;
        debug!(from = %from.display(), to = %to.display(), "copied tree");
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> StoreResult<()> {
        if !from.try_exists()? {
            return Err(StoreError::NotFound(from.to_path_buf()));
        }
        if to.try_exists()? {
            return Err(StoreError::AlreadyExists(to.to_path_buf()));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let path = dir.path().join("a/b/entry.md");
        fs.write(&path, "hello").unwrap();
        assert_eq!(fs.read(&path).unwrap().as_deref(), Some("hello"));
        assert_eq!(fs.stamp(&path).unwrap().unwrap().len, 5);
    }

    #[test]
    fn missing_paths_are_not_errors() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let missing = dir.path().join("missing");
        assert!(fs.read(&missing).unwrap().is_none());
        assert!(fs.stamp(&missing).unwrap().is_none());
        assert!(!fs.delete(&missing).unwrap());
        assert!(fs.list_children(&missing).unwrap().is_empty());
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let path = dir.path().join("entry.md");
        fs.write(&path, "one").unwrap();
        fs.write(&path, "two").unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(fs.read(&path).unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn list_children_skips_files() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        fs.write(&dir.path().join("foo/entry.md"), "").unwrap();
        fs.write(&dir.path().join("foo/zed/entry.md"), "").unwrap();
        fs.write(&dir.path().join("foo/bar/entry.md"), "").unwrap();
        assert_eq!(
            fs.list_children(&dir.path().join("foo")).unwrap(),
            vec!["bar", "zed"]
        );
    }

    #[test]
    fn copy_and_rename_trees() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let root = dir.path();
        fs.write(&root.join("foo/entry.md"), "foo").unwrap();
        fs.write(&root.join("foo/bar/entry.md"), "bar").unwrap();

        fs.copy_tree(&root.join("foo"), &root.join("zed")).unwrap();
        assert_eq!(fs.read(&root.join("zed/bar/entry.md")).unwrap().as_deref(), Some("bar"));
        assert!(matches!(
            fs.copy_tree(&root.join("foo"), &root.join("zed")),
            Err(StoreError::AlreadyExists(_))
        ));

        fs.rename(&root.join("foo"), &root.join("moved/foo")).unwrap();
        assert!(!fs.exists(&root.join("foo")).unwrap());
        assert!(fs.exists(&root.join("moved/foo/bar/entry.md")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn failed_copy_leaves_no_target_behind() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let root = dir.path();
        fs.write(&root.join("foo/entry.md"), "foo").unwrap();
        std::os::unix::fs::symlink(root.join("nowhere"), root.join("foo/broken")).unwrap();

        assert!(matches!(
            fs.copy_tree(&root.join("foo"), &root.join("zed")),
            Err(StoreError::Io(_))
        ));
        assert!(!fs.exists(&root.join("zed")).unwrap());
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["foo"]);

        std::fs::remove_file(root.join("foo/broken")).unwrap();
        fs.copy_tree(&root.join("foo"), &root.join("zed")).unwrap();
        assert_eq!(fs.read(&root.join("zed/entry.md")).unwrap().as_deref(), Some("foo"));
    }
}

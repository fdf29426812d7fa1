//! Maps entry ids onto their document file and directory.

use std::path::{Path, PathBuf};

use folio_types::EntryId;

/// File name of the document inside every entry directory.
pub const DEFAULT_DOCUMENT_NAME: &str = "entry.md";

/// Storage location of one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Path of the front-matter document.
    pub document: PathBuf,
    /// Directory holding the document and any descendant entries.
    pub directory: PathBuf,
}

/// Pure mapping from entry id to storage paths under a fixed root.
///
/// Never touches the filesystem. Escape sequences are ruled out by
/// [`EntryId`] validation, so every location is inside `root`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
    document_name: String,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
        }
    }

    /// Use a different document file name than `entry.md`.
    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// Resolve both paths for `id`.
    pub fn locate(&self, id: &EntryId) -> Location {
        let directory = self.directory_location(id);
        Location {
            document: directory.join(&self.document_name),
            directory,
        }
    }

    pub fn file_location(&self, id: &EntryId) -> PathBuf {
        self.directory_location(id).join(&self.document_name)
    }

    pub fn directory_location(&self, id: &EntryId) -> PathBuf {
        id.segments()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

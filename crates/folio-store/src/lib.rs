//! Storage layer for folio entries.
//!
//! An entry `blog/hello` lives in the directory `<root>/blog/hello/` as a
//! single front-matter document (`entry.md`). Descendant entries are nested
//! directories. This crate owns the pieces that touch that layout:
//!
//! - [`Filesystem`] -- substitutable backing store (`read`, `write`,
//!   `delete`, `exists`, `list_children`, `stamp`, `copy_tree`, `rename`)
//! - [`LocalFilesystem`] -- disk backend with atomic temp-then-rename writes
//! - [`InMemoryFilesystem`] -- map-backed store for tests and embedding
//! - [`PathResolver`] -- pure id-to-path mapping under a configured root
//! - [`DocumentCodec`] / [`FrontmatterCodec`] -- YAML front matter + body
//!
//! # Design Rules
//!
//! 1. Absent paths are values (`None`, `false`), not errors.
//! 2. Writes are atomic; a failed write leaves the previous contents intact.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod codec;
pub mod error;
pub mod local;
pub mod memory;
pub mod resolver;
pub mod traits;

pub use codec::{DocumentCodec, FrontmatterCodec, BODY_FIELD};
pub use error::{StoreError, StoreResult};
pub use local::{write_atomic, LocalFilesystem};
pub use memory::InMemoryFilesystem;
pub use resolver::{Location, PathResolver, DEFAULT_DOCUMENT_NAME};
pub use traits::{FileStamp, Filesystem};

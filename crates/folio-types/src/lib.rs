//! Foundation types for folio.
//!
//! Every other folio crate depends on `folio-types`.
//!
//! # Key Types
//!
//! - [`EntryId`] -- Validated, slash-delimited hierarchical entry name
//! - [`Fields`] -- Field mapping decoded from a front-matter document
//! - [`FlatFields`] -- Dotted-leaf view produced by [`flatten`]

pub mod error;
pub mod fields;
pub mod id;

pub use error::TypeError;
pub use fields::{flatten, get_path, Fields, FlatFields};
pub use id::EntryId;

/// Re-exported so downstream crates share one value type.
pub use serde_json::Value;

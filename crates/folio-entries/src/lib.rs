//! Entry repository for folio.
//!
//! [`Entries`] is the surface request handlers talk to: CRUD over
//! hierarchical ids, single and collection fetches, and a table of named
//! operations that can be extended at runtime.
//!
//! A fetch reads the raw document (through the [`folio_cache::Cache`]),
//! places it in an operation-scoped [`StorageRegistry`], and publishes
//! [`Event::FetchSingleHasResult`]. The built-in field hooks in [`fields`]
//! are subscribed to that event and fill in computed fields such as `slug`
//! and `published_at`. Create, update, delete, copy and move publish their
//! own events before writing, so a hook can rewrite the data or veto the
//! operation by returning an error.

pub mod config;
pub mod error;
pub mod event;
pub mod extension;
pub mod fetch;
pub mod fields;
pub mod registry;
pub mod repository;

pub use config::{CacheSettings, DefaultedField, FieldSettings, FieldToggle, Settings};
pub use error::{EntriesError, EntriesResult};
pub use event::{Clock, Event, EventBus, Handler, HookContext};
pub use extension::{operation, CapabilityProvider, Operation, OperationTable};
pub use fetch::{Collection, FetchOptions, Fetched};
pub use fields::{FieldHook, FieldHookEntry, BUILTIN_HOOKS};
pub use registry::StorageRegistry;
pub use repository::{Entries, EntriesBuilder};

pub use folio_store::Location;
pub use folio_types::{EntryId, Fields, FlatFields, Value};

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_store::{FileStamp, Filesystem, PathResolver};
use folio_types::{EntryId, Value};
use tracing::trace;

use crate::config::Settings;
use crate::error::EntriesResult;
use crate::registry::StorageRegistry;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A named pipeline stage. Events carry no payload; everything a subscriber
/// needs is in the [`StorageRegistry`] of the operation that published it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {
    /// A single entry was read; `fetch.id` / `fetch.data` hold it.
    FetchSingleHasResult,
    /// A collection was aggregated; `fetch.data.<child id>` holds each child.
    FetchCollectionHasResult,
    /// An entry is about to be written for the first time.
    Create,
    /// Merged fields are about to replace an existing entry.
    Update,
    /// An entry subtree is about to be removed.
    Delete,
    /// An entry subtree is about to be duplicated.
    Copy,
    /// An entry subtree is about to be moved.
    Move,
}

impl Event {
    pub const ALL: [Event; 7] = [
        Event::FetchSingleHasResult,
        Event::FetchCollectionHasResult,
        Event::Create,
        Event::Update,
        Event::Delete,
        Event::Copy,
        Event::Move,
    ];

    /// Registry prefix the event's operation writes under.
    pub fn scope(&self) -> &'static str {
        match self {
            Self::FetchSingleHasResult | Self::FetchCollectionHasResult => "fetch",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchSingleHasResult => "entries.fetch_single.has_result",
            Self::FetchCollectionHasResult => "entries.fetch_collection.has_result",
            Self::Create => "entries.create",
            Self::Update => "entries.update",
            Self::Delete => "entries.delete",
            Self::Copy => "entries.copy",
            Self::Move => "entries.move",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// HookContext
// ---------------------------------------------------------------------------

/// Source of "now" for hooks that stamp dates.
pub type Clock = fn() -> DateTime<Utc>;

/// Everything a subscriber can reach while an event is being published.
///
/// The registry is the only mutable state; the rest are read-only services
/// of the repository that published the event.
pub struct HookContext<'a> {
    pub(crate) event: Event,
    pub(crate) registry: &'a mut StorageRegistry,
    pub(crate) fs: &'a dyn Filesystem,
    pub(crate) resolver: &'a PathResolver,
    pub(crate) settings: &'a Settings,
    pub(crate) clock: Clock,
}

impl<'a> HookContext<'a> {
    pub fn new(
        event: Event,
        registry: &'a mut StorageRegistry,
        fs: &'a dyn Filesystem,
        resolver: &'a PathResolver,
        settings: &'a Settings,
        clock: Clock,
    ) -> Self {
        Self {
            event,
            registry,
            fs,
            resolver,
            settings,
            clock,
        }
    }

    pub fn event(&self) -> Event {
        self.event
    }

    pub fn registry(&self) -> &StorageRegistry {
        &*self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StorageRegistry {
        &mut *self.registry
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// The id of the entry the current operation is working on.
    pub fn entry_id(&self) -> Option<EntryId> {
        let raw = self.registry.get_str(&format!("{}.id", self.event.scope()))?;
        EntryId::new(raw).ok()
    }

    /// Registry path of `field` inside the in-progress data.
    pub fn data_path(&self, field: &str) -> String {
        format!("{}.data.{field}", self.event.scope())
    }

    pub fn field(&self, field: &str) -> Option<&Value> {
        self.registry.get(&self.data_path(field))
    }

    /// `true` if the field holds a non-null value.
    pub fn field_is_set(&self, field: &str) -> bool {
        self.field(field).is_some_and(|v| !v.is_null())
    }

    pub fn set_field(&mut self, field: &str, value: impl Into<Value>) {
        let path = self.data_path(field);
        self.registry.set(&path, value);
    }

    /// File stamp of the current entry's document, if it exists on disk.
    pub fn document_stamp(&self) -> EntriesResult<Option<FileStamp>> {
        let Some(id) = self.entry_id() else {
            return Ok(None);
        };
        Ok(self.fs.stamp(&self.resolver.file_location(&id))?)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Callback invoked when an event is published.
pub type Handler = Arc<dyn Fn(&mut HookContext<'_>) -> EntriesResult<()> + Send + Sync>;

struct Subscriber {
    event: Event,
    name: String,
    handler: Handler,
}

/// Synchronous publish/subscribe keyed by [`Event`].
///
/// Handlers for one event run in registration order on the publisher's
/// thread. The first handler error stops dispatch and is returned.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an anonymous handler.
    pub fn subscribe<F>(&mut self, event: Event, handler: F)
    where
        F: Fn(&mut HookContext<'_>) -> EntriesResult<()> + Send + Sync + 'static,
    {
        self.subscribe_named(event, "anonymous", handler);
    }

    /// Subscribe a handler under a name used in logs and introspection.
    pub fn subscribe_named<F>(&mut self, event: Event, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut HookContext<'_>) -> EntriesResult<()> + Send + Sync + 'static,
    {
        self.subscribers.push(Subscriber {
            event,
            name: name.into(),
            handler: Arc::new(handler),
        });
    }

    /// Invoke every handler subscribed to `ctx.event()`.
    pub fn publish(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        let event = ctx.event();
        for sub in self.subscribers.iter().filter(|s| s.event == event) {
            trace!(%event, hook = %sub.name, "dispatching");
            (sub.handler)(ctx)?;
        }
        Ok(())
    }

    /// Names of the handlers subscribed to `event`, in dispatch order.
    pub fn subscribers(&self, event: Event) -> Vec<&str> {
        self.subscribers
            .iter()
            .filter(|s| s.event == event)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntriesError;
    use folio_store::InMemoryFilesystem;
    use std::sync::Mutex;

    struct Fixture {
        fs: InMemoryFilesystem,
        resolver: PathResolver,
        settings: Settings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                fs: InMemoryFilesystem::new(),
                resolver: PathResolver::new("/r"),
                settings: Settings::with_root("/r"),
            }
        }

        fn ctx<'a>(&'a self, event: Event, registry: &'a mut StorageRegistry) -> HookContext<'a> {
            HookContext::new(event, registry, &self.fs, &self.resolver, &self.settings, Utc::now)
        }
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for i in 0..3 {
            let order = order.clone();
            bus.subscribe(Event::Create, move |_| {
                order.lock().unwrap().push(i);
                Ok(())
            });
        }
        let fx = Fixture::new();
        let mut registry = StorageRegistry::new();
        bus.publish(&mut fx.ctx(Event::Create, &mut registry)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn only_matching_event_is_dispatched() {
        let mut bus = EventBus::new();
        bus.subscribe_named(Event::Create, "marker", |ctx| {
            ctx.set_field("marked", true);
            Ok(())
        });
        let fx = Fixture::new();
        let mut registry = StorageRegistry::new();
        bus.publish(&mut fx.ctx(Event::Update, &mut registry)).unwrap();
        assert!(registry.is_empty());
        bus.publish(&mut fx.ctx(Event::Create, &mut registry)).unwrap();
        assert_eq!(registry.get_bool("create.data.marked"), Some(true));
        assert_eq!(bus.subscribers(Event::Create), vec!["marker"]);
    }

    #[test]
    fn handler_error_stops_dispatch() {
        let mut bus = EventBus::new();
        bus.subscribe_named(Event::Delete, "veto", |_| Err(EntriesError::hook("veto", "no")));
        bus.subscribe(Event::Delete, |ctx| {
            ctx.registry_mut().set("reached", true);
            Ok(())
        });
        let fx = Fixture::new();
        let mut registry = StorageRegistry::new();
        let err = bus.publish(&mut fx.ctx(Event::Delete, &mut registry)).unwrap_err();
        assert!(matches!(err, EntriesError::Hook { .. }));
        assert!(!registry.has("reached"));
    }

    #[test]
    fn context_reads_scoped_id_and_fields() {
        let fx = Fixture::new();
        let mut registry = StorageRegistry::new();
        registry.set("fetch.id", "blog/hello");
        registry.set("fetch.data.title", "Hello");
        registry.set("fetch.data.slug", Value::Null);
        let ctx = fx.ctx(Event::FetchSingleHasResult, &mut registry);
        assert_eq!(ctx.entry_id().unwrap().as_str(), "blog/hello");
        assert!(ctx.field_is_set("title"));
        assert!(!ctx.field_is_set("slug"));
        assert_eq!(ctx.data_path("title"), "fetch.data.title");
    }

    #[test]
    fn document_stamp_uses_resolver() {
        let fx = Fixture::new();
        fx.fs.write(std::path::Path::new("/r/foo/entry.md"), "---\n---\n").unwrap();
        let mut registry = StorageRegistry::new();
        registry.set("fetch.id", "foo");
        let ctx = fx.ctx(Event::FetchSingleHasResult, &mut registry);
        assert!(ctx.document_stamp().unwrap().is_some());
    }
}

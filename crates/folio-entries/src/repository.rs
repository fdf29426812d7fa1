use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use folio_cache::{Cache, FileCache, MemoryCache, OperationKind};
use folio_store::{
    DocumentCodec, FileStamp, Filesystem, FrontmatterCodec, LocalFilesystem, Location,
    PathResolver, StoreError,
};
use folio_types::{flatten, EntryId, Fields, Value};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{EntriesError, EntriesResult};
use crate::event::{Clock, Event, EventBus, HookContext};
use crate::extension::{CapabilityProvider, Operation, OperationTable};
use crate::fetch::{Collection, FetchOptions, Fetched};
use crate::fields;
use crate::registry::{paths, StorageRegistry};

/// Hierarchical entry repository.
///
/// Every call parses its id, owns a fresh [`StorageRegistry`] for the
/// duration of the call, and publishes its lifecycle event before touching
/// the filesystem. Missing or conflicting ids come back as `Ok(false)` or
/// an empty result; only I/O, codec and hook failures are errors.
pub struct Entries {
    settings: Settings,
    fs: Arc<dyn Filesystem>,
    codec: Box<dyn DocumentCodec>,
    resolver: PathResolver,
    cache: Cache,
    events: EventBus,
    operations: OperationTable,
    clock: Clock,
}

impl Entries {
    /// Start building a repository from `settings`.
    pub fn builder(settings: Settings) -> EntriesBuilder {
        EntriesBuilder::new(settings)
    }

    /// Repository on the local disk with default collaborators.
    pub fn open(settings: Settings) -> Self {
        Self::builder(settings).build()
    }

    // ---- Accessors ----

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Attach a handler to one of the repository's lifecycle events.
    pub fn subscribe<F>(&mut self, event: Event, handler: F)
    where
        F: Fn(&mut HookContext<'_>) -> EntriesResult<()> + Send + Sync + 'static,
    {
        self.events.subscribe(event, handler);
    }

    pub fn subscribe_named<F>(&mut self, event: Event, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut HookContext<'_>) -> EntriesResult<()> + Send + Sync + 'static,
    {
        self.events.subscribe_named(event, name, handler);
    }

    // ---- Locations ----

    /// Document and directory paths of `id`.
    pub fn locate(&self, id: &str) -> EntriesResult<Location> {
        Ok(self.resolver.locate(&EntryId::new(id)?))
    }

    pub fn file_location(&self, id: &str) -> EntriesResult<PathBuf> {
        Ok(self.resolver.file_location(&EntryId::new(id)?))
    }

    pub fn directory_location(&self, id: &str) -> EntriesResult<PathBuf> {
        Ok(self.resolver.directory_location(&EntryId::new(id)?))
    }

    /// Cache fingerprint of the entry's current document.
    ///
    /// Empty when caching is disabled or the entry does not exist.
    pub fn cache_id(&self, id: &str) -> EntriesResult<String> {
        let id = EntryId::new(id)?;
        let stamp = self.fs.stamp(&self.resolver.file_location(&id))?;
        Ok(self.cache.cache_id(&id, stamp.as_ref()))
    }

    // ---- CRUD ----

    /// `true` iff the entry's document exists.
    pub fn has(&self, id: &str) -> EntriesResult<bool> {
        let id = EntryId::new(id)?;
        self.exists(&id)
    }

    fn exists(&self, id: &EntryId) -> EntriesResult<bool> {
        Ok(self.fs.exists(&self.resolver.file_location(id))?)
    }

    /// Write a new entry. `Ok(false)` if it already exists.
    pub fn create(&self, id: &str, fields: Fields) -> EntriesResult<bool> {
        let id = EntryId::new(id)?;
        if self.exists(&id)? {
            debug!(%id, "create refused: entry exists");
            return Ok(false);
        }

        let mut registry = StorageRegistry::new();
        registry.set(paths::CREATE_ID, id.as_str());
        registry.set(paths::CREATE_DATA, Value::Object(fields));
        self.publish(Event::Create, &mut registry)?;
        let data = take_data(&mut registry, Event::Create, paths::CREATE_DATA)?;

        self.write_document(&id, &data)?;
        info!(%id, fields = data.len(), "entry created");
        Ok(true)
    }

    /// Merge `fields` into an existing entry. `Ok(false)` if it is missing.
    pub fn update(&self, id: &str, fields: Fields) -> EntriesResult<bool> {
        let id = EntryId::new(id)?;
        let path = self.resolver.file_location(&id);
        let Some(text) = self.fs.read(&path)? else {
            debug!(%id, "update refused: entry missing");
            return Ok(false);
        };

        let mut merged = self.decode(&id, &text)?;
        merged.extend(fields);

        let mut registry = StorageRegistry::new();
        registry.set(paths::UPDATE_ID, id.as_str());
        registry.set(paths::UPDATE_DATA, Value::Object(merged));
        self.publish(Event::Update, &mut registry)?;
        let data = take_data(&mut registry, Event::Update, paths::UPDATE_DATA)?;

        self.write_document(&id, &data)?;
        info!(%id, fields = data.len(), "entry updated");
        Ok(true)
    }

    /// Remove an entry and every descendant. `Ok(false)` if it is missing.
    pub fn delete(&self, id: &str) -> EntriesResult<bool> {
        let id = EntryId::new(id)?;
        if !self.exists(&id)? {
            debug!(%id, "delete refused: entry missing");
            return Ok(false);
        }

        let mut registry = StorageRegistry::new();
        registry.set(paths::DELETE_ID, id.as_str());
        self.publish(Event::Delete, &mut registry)?;

        let removed = self.fs.delete(&self.resolver.directory_location(&id))?;
        if removed {
            info!(%id, "entry deleted");
        }
        Ok(removed)
    }

    /// Duplicate the subtree at `id` under `new_id`.
    ///
    /// `Ok(false)` if `id` is missing, `new_id` is taken, or `new_id` lies
    /// inside `id`.
    pub fn copy(&self, id: &str, new_id: &str) -> EntriesResult<bool> {
        let (id, new_id) = (EntryId::new(id)?, EntryId::new(new_id)?);
        if !self.can_relocate(&id, &new_id)? {
            return Ok(false);
        }

        let mut registry = StorageRegistry::new();
        registry.set(paths::COPY_ID, id.as_str());
        registry.set(paths::COPY_NEW_ID, new_id.as_str());
        self.publish(Event::Copy, &mut registry)?;

        let result = self.fs.copy_tree(
            &self.resolver.directory_location(&id),
            &self.resolver.directory_location(&new_id),
        );
        let copied = conflict_as_false(result)?;
        if copied {
            info!(from = %id, to = %new_id, "entry copied");
        }
        Ok(copied)
    }

    /// Rename the subtree at `id` to `new_id`.
    ///
    /// Fails the same way as [`copy`](Self::copy); on failure nothing moves.
    pub fn move_entry(&self, id: &str, new_id: &str) -> EntriesResult<bool> {
        let (id, new_id) = (EntryId::new(id)?, EntryId::new(new_id)?);
        if !self.can_relocate(&id, &new_id)? {
            return Ok(false);
        }

        let mut registry = StorageRegistry::new();
        registry.set(paths::MOVE_ID, id.as_str());
        registry.set(paths::MOVE_NEW_ID, new_id.as_str());
        self.publish(Event::Move, &mut registry)?;

        let result = self.fs.rename(
            &self.resolver.directory_location(&id),
            &self.resolver.directory_location(&new_id),
        );
        let moved = conflict_as_false(result)?;
        if moved {
            info!(from = %id, to = %new_id, "entry moved");
        }
        Ok(moved)
    }

    fn can_relocate(&self, id: &EntryId, new_id: &EntryId) -> EntriesResult<bool> {
        if !self.exists(id)? {
            debug!(%id, "relocation refused: source missing");
            return Ok(false);
        }
        if new_id == id || new_id.is_descendant_of(id) {
            debug!(%id, %new_id, "relocation refused: target inside source");
            return Ok(false);
        }
        if self.fs.exists(&self.resolver.directory_location(new_id))? {
            debug!(%new_id, "relocation refused: target exists");
            return Ok(false);
        }
        Ok(true)
    }

    // ---- Fetch ----

    /// Fetch one entry or its descendants, depending on `options`.
    ///
    /// Collections are sorted and paged by `options` after their hooks ran.
    pub fn fetch(&self, id: &str, options: FetchOptions) -> EntriesResult<Fetched> {
        if options.collection {
            let collection = self.fetch_collection(id, options.recursive)?;
            Ok(Fetched::Collection(options.arrange(collection)))
        } else {
            Ok(Fetched::Single(flatten(&self.fetch_single(id)?)))
        }
    }

    /// Read one entry and run the field pipeline over it.
    ///
    /// Empty when the entry does not exist. A document that cannot be
    /// decoded is an [`EntriesError::Corrupt`] error.
    pub fn fetch_single(&self, id: &str) -> EntriesResult<Fields> {
        let id = EntryId::new(id)?;
        self.fetch_entry(&id)
    }

    fn fetch_entry(&self, id: &EntryId) -> EntriesResult<Fields> {
        let path = self.resolver.file_location(id);
        let Some(stamp) = self.fs.stamp(&path)? else {
            debug!(%id, "fetch: entry missing");
            return Ok(Fields::new());
        };
        let Some(raw) = self.load_raw(id, &path, &stamp)? else {
            return Ok(Fields::new());
        };

        let mut registry = StorageRegistry::new();
        registry.set(paths::FETCH_ID, id.as_str());
        registry.set(paths::FETCH_DATA, Value::Object(raw));
        self.publish(Event::FetchSingleHasResult, &mut registry)?;
        take_data(&mut registry, Event::FetchSingleHasResult, paths::FETCH_DATA)
    }

    /// Decoded document fields, through the cache.
    fn load_raw(&self, id: &EntryId, path: &Path, stamp: &FileStamp) -> EntriesResult<Option<Fields>> {
        let key = self.cache.key(id, OperationKind::Document, Some(stamp));
        let loaded = self
            .cache
            .get_or_compute::<EntriesError, _>(key.as_ref(), || {
                let text = self
                    .fs
                    .read(path)?
                    .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))?;
                Ok(Value::Object(self.decode(id, &text)?))
            });
        match loaded {
            Ok(Value::Object(fields)) => Ok(Some(fields)),
            Ok(other) => Err(EntriesError::Corrupt {
                id: id.to_string(),
                reason: format!("cached document is not a mapping: {other}"),
            }),
            Err(EntriesError::Store(StoreError::NotFound(_))) => {
                debug!(%id, "fetch: entry vanished during read");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the entries below `id`: direct children, or every descendant
    /// when `recursive`.
    ///
    /// Subscribers to [`Event::FetchCollectionHasResult`] may rewrite any
    /// `fetch.data.<child id>.<field>` path; changes are not persisted.
    pub fn fetch_collection(&self, id: &str, recursive: bool) -> EntriesResult<Collection> {
        let id = EntryId::new(id)?;
        let mut collection = Collection::new();
        self.collect_children(&id, recursive, &mut collection)?;

        let mut registry = StorageRegistry::new();
        registry.set(paths::FETCH_ID, id.as_str());
        registry.set(paths::FETCH_DATA, Value::Object(collection.into_fields()));
        self.publish(Event::FetchCollectionHasResult, &mut registry)?;

        let data = take_data(&mut registry, Event::FetchCollectionHasResult, paths::FETCH_DATA)?;
        let result = Collection::from_fields(data).map_err(|child| {
            EntriesError::hook(
                Event::FetchCollectionHasResult.name(),
                format!("{}.{child} is no longer a mapping", paths::FETCH_DATA),
            )
        })?;
        debug!(%id, recursive, entries = result.len(), "collection fetched");
        Ok(result)
    }

    fn collect_children(
        &self,
        parent: &EntryId,
        recursive: bool,
        out: &mut Collection,
    ) -> EntriesResult<()> {
        let dir = self.resolver.directory_location(parent);
        for name in self.fs.list_children(&dir)? {
            let child = match parent.join(&name) {
                Ok(child) => child,
                Err(e) => {
                    warn!(%parent, name = %name, error = %e, "skipping directory with invalid entry name");
                    continue;
                }
            };
            let fields = self.fetch_entry(&child)?;
            if !fields.is_empty() {
                out.insert(child.as_str(), fields);
            }
            if recursive {
                self.collect_children(&child, true, out)?;
            }
        }
        Ok(())
    }

    // ---- Extension ----

    /// Register `f` under `name`, replacing any previous operation.
    pub fn register_operation<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Entries, &[Value]) -> EntriesResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.operations.register(name.clone(), Arc::new(f)).is_some() {
            debug!(operation = %name, "operation replaced");
        } else {
            debug!(operation = %name, "operation registered");
        }
    }

    /// Import every operation `provider` exposes.
    pub fn import_capabilities(&mut self, provider: &dyn CapabilityProvider) -> usize {
        let count = self.operations.import(provider);
        debug!(count, "capabilities imported");
        count
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains(name)
    }

    /// Names of the registered operations, sorted.
    pub fn operations(&self) -> Vec<&str> {
        self.operations.names().collect()
    }

    /// Invoke a registered operation.
    pub fn call(&self, name: &str, args: &[Value]) -> EntriesResult<Value> {
        let op: Operation = self
            .operations
            .get(name)
            .cloned()
            .ok_or_else(|| EntriesError::UnknownOperation(name.to_string()))?;
        op(self, args)
    }

    // ---- Internals ----

    fn publish(&self, event: Event, registry: &mut StorageRegistry) -> EntriesResult<()> {
        let mut ctx = HookContext::new(
            event,
            registry,
            self.fs.as_ref(),
            &self.resolver,
            &self.settings,
            self.clock,
        );
        self.events.publish(&mut ctx)
    }

    fn decode(&self, id: &EntryId, text: &str) -> EntriesResult<Fields> {
        self.codec.decode(text).map_err(|e| EntriesError::Corrupt {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn write_document(&self, id: &EntryId, fields: &Fields) -> EntriesResult<()> {
        let text = self.codec.encode(fields)?;
        self.fs.write(&self.resolver.file_location(id), &text)?;
        Ok(())
    }
}

/// Remove the in-progress data a hook pipeline left at `path`.
///
/// A hook that deleted the slot or replaced it with a non-mapping aborts
/// the operation; nothing is written.
fn take_data(registry: &mut StorageRegistry, event: Event, path: &str) -> EntriesResult<Fields> {
    match registry.remove(path) {
        Some(Value::Object(fields)) => Ok(fields),
        Some(other) => Err(EntriesError::hook(
            event.name(),
            format!("{path} was replaced with a non-mapping value: {other}"),
        )),
        None => Err(EntriesError::hook(event.name(), format!("{path} was removed"))),
    }
}

fn conflict_as_false(result: Result<(), StoreError>) -> EntriesResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(StoreError::NotFound(_) | StoreError::AlreadyExists(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl std::fmt::Debug for Entries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entries")
            .field("root", &self.resolver.root())
            .field("cache", &self.cache)
            .field("events", &self.events)
            .field("operations", &self.operations)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EntriesBuilder
// ---------------------------------------------------------------------------

/// Assembles an [`Entries`] from settings and optional collaborators.
pub struct EntriesBuilder {
    settings: Settings,
    fs: Option<Arc<dyn Filesystem>>,
    codec: Option<Box<dyn DocumentCodec>>,
    cache: Option<Cache>,
    clock: Clock,
}

impl EntriesBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            fs: None,
            codec: None,
            cache: None,
            clock: Utc::now,
        }
    }

    pub fn filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn codec(mut self, codec: Box<dyn DocumentCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Use `cache` instead of one built from `settings.cache`.
    pub fn cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Entries {
        let settings = self.settings;
        let resolver = PathResolver::new(&settings.root)
            .with_document_name(settings.document_name.clone());
        let cache = self.cache.unwrap_or_else(|| {
            let enabled = settings.cache.enabled;
            match &settings.cache.directory {
                Some(dir) => Cache::new(enabled, Box::new(FileCache::new(dir))),
                None => Cache::new(enabled, Box::new(MemoryCache::new())),
            }
        });

        let mut events = EventBus::new();
        fields::install(&mut events, &settings);

        info!(
            root = %resolver.root().display(),
            cache = cache.is_enabled(),
            hooks = events.len(),
            "entry repository ready"
        );

        Entries {
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFilesystem::new())),
            codec: self.codec.unwrap_or_else(|| Box::new(FrontmatterCodec::new())),
            resolver,
            cache,
            events,
            operations: OperationTable::new(),
            clock: self.clock,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::InMemoryFilesystem;
    use serde_json::json;

    fn repo() -> (Entries, Arc<InMemoryFilesystem>) {
        let fs = Arc::new(InMemoryFilesystem::new());
        let entries = Entries::builder(Settings::with_root("/site/entries"))
            .filesystem(fs.clone())
            .build();
        (entries, fs)
    }

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn create_writes_front_matter_document() {
        let (entries, fs) = repo();
        assert!(entries.create("blog", fields(json!({"title": "Blog"}))).unwrap());
        let text = fs
            .read(Path::new("/site/entries/blog/entry.md"))
            .unwrap()
            .unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("title: Blog"));
    }

    #[test]
    fn update_merges_and_keeps_other_fields() {
        let (entries, _) = repo();
        entries
            .create("page", fields(json!({"title": "Old", "lang": "en"})))
            .unwrap();
        assert!(entries.update("page", fields(json!({"title": "New"}))).unwrap());
        let got = entries.fetch_single("page").unwrap();
        assert_eq!(got["title"], json!("New"));
        assert_eq!(got["lang"], json!("en"));
        assert!(!entries.update("missing", Fields::new()).unwrap());
    }

    #[test]
    fn copy_into_own_subtree_is_refused() {
        let (entries, _) = repo();
        entries.create("a", Fields::new()).unwrap();
        assert!(!entries.copy("a", "a/b").unwrap());
        assert!(!entries.copy("a", "a").unwrap());
        assert!(!entries.move_entry("a", "a/b").unwrap());
        assert!(entries.has("a").unwrap());
    }

    #[test]
    fn hook_error_aborts_before_write() {
        let (mut entries, fs) = repo();
        entries.subscribe(Event::Create, |_| Err(EntriesError::hook("guard", "read-only")));
        let err = entries.create("x", Fields::new()).unwrap_err();
        assert!(matches!(err, EntriesError::Hook { .. }));
        assert_eq!(fs.file_count(), 0);
    }

    #[test]
    fn invalid_id_is_an_error() {
        let (entries, _) = repo();
        assert!(matches!(
            entries.has("../etc"),
            Err(EntriesError::InvalidId(_))
        ));
    }

    #[test]
    fn unknown_operation() {
        let (entries, _) = repo();
        assert!(matches!(
            entries.call("nope", &[]),
            Err(EntriesError::UnknownOperation(name)) if name == "nope"
        ));
    }
}

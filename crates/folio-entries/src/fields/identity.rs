use super::{FieldHook, ON_FETCH};
use crate::error::EntriesResult;
use crate::event::{Event, HookContext};

/// Exposes the entry id as the `id` field.
#[derive(Debug, Clone, Copy)]
pub struct IdHook;

impl FieldHook for IdHook {
    fn name(&self) -> &'static str {
        "id"
    }

    fn events(&self) -> &'static [Event] {
        ON_FETCH
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        if let Some(id) = ctx.entry_id() {
            ctx.set_field("id", id.as_str());
        }
        Ok(())
    }
}

/// Derives `slug` from the last id segment unless one is stored.
#[derive(Debug, Clone, Copy)]
pub struct SlugHook;

impl FieldHook for SlugHook {
    fn name(&self) -> &'static str {
        "slug"
    }

    fn events(&self) -> &'static [Event] {
        ON_FETCH
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        if ctx.field_is_set("slug") {
            return Ok(());
        }
        if let Some(id) = ctx.entry_id() {
            ctx.set_field("slug", id.name());
        }
        Ok(())
    }
}

/// Sets `modified_at` to the document's modification time in unix seconds.
#[derive(Debug, Clone, Copy)]
pub struct ModifiedAtHook;

impl FieldHook for ModifiedAtHook {
    fn name(&self) -> &'static str {
        "modified_at"
    }

    fn events(&self) -> &'static [Event] {
        ON_FETCH
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        if let Some(stamp) = ctx.document_stamp()? {
            ctx.set_field("modified_at", stamp.modified_secs());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::registry::StorageRegistry;
    use chrono::Utc;
    use folio_store::{Filesystem, InMemoryFilesystem, PathResolver};
    use serde_json::json;
    use std::path::Path;

    fn apply(hook: &dyn FieldHook, fs: &InMemoryFilesystem, registry: &mut StorageRegistry) {
        let settings = Settings::with_root("/r");
        let resolver = PathResolver::new("/r");
        let mut ctx = HookContext::new(
            Event::FetchSingleHasResult,
            registry,
            fs,
            &resolver,
            &settings,
            Utc::now,
        );
        hook.apply(&mut ctx).unwrap();
    }

    #[test]
    fn slug_defaults_to_last_segment() {
        let fs = InMemoryFilesystem::new();
        let mut registry = StorageRegistry::new();
        registry.set("fetch.id", "blog/nested/post");
        apply(&SlugHook, &fs, &mut registry);
        assert_eq!(registry.get_str("fetch.data.slug"), Some("post"));
    }

    #[test]
    fn explicit_slug_is_kept() {
        let fs = InMemoryFilesystem::new();
        let mut registry = StorageRegistry::new();
        registry.set("fetch.id", "blog/post");
        registry.set("fetch.data.slug", "custom");
        apply(&SlugHook, &fs, &mut registry);
        assert_eq!(registry.get_str("fetch.data.slug"), Some("custom"));
    }

    #[test]
    fn id_is_always_the_entry_id() {
        let fs = InMemoryFilesystem::new();
        let mut registry = StorageRegistry::new();
        registry.set("fetch.id", "blog/post");
        registry.set("fetch.data", json!({"id": "stale"}));
        apply(&IdHook, &fs, &mut registry);
        assert_eq!(registry.get_str("fetch.data.id"), Some("blog/post"));
    }

    #[test]
    fn modified_at_tracks_the_document() {
        let fs = InMemoryFilesystem::new();
        fs.write(Path::new("/r/post/entry.md"), "body").unwrap();
        let mut registry = StorageRegistry::new();
        registry.set("fetch.id", "post");
        apply(&ModifiedAtHook, &fs, &mut registry);
        let secs = registry.get_i64("fetch.data.modified_at").unwrap();
        let stamp = fs.stamp(Path::new("/r/post/entry.md")).unwrap().unwrap();
        assert_eq!(secs, stamp.modified_secs());
    }
}

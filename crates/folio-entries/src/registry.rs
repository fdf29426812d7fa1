//! Operation-scoped scratch state shared between the repository and its hooks.
//!
//! Paths are dot-delimited (`fetch.data.title`). Segments may contain `/`,
//! which is how collection hooks address one child: `fetch.data.foo/zed.title`.

use folio_types::{Fields, Value};

/// Well-known registry paths written by the repository.
pub mod paths {
    pub const FETCH_ID: &str = "fetch.id";
    pub const FETCH_DATA: &str = "fetch.data";
    pub const CREATE_ID: &str = "create.id";
    pub const CREATE_DATA: &str = "create.data";
    pub const UPDATE_ID: &str = "update.id";
    pub const UPDATE_DATA: &str = "update.data";
    pub const DELETE_ID: &str = "delete.id";
    pub const COPY_ID: &str = "copy.id";
    pub const COPY_NEW_ID: &str = "copy.new_id";
    pub const MOVE_ID: &str = "move.id";
    pub const MOVE_NEW_ID: &str = "move.new_id";
}

/// Tree of values addressed by dotted paths.
///
/// One instance belongs to exactly one repository operation. `get` returns
/// `None` for an absent path and `Some(&Value::Null)` for a stored null, so
/// hooks can tell "never set" from "explicitly cleared".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorageRegistry {
    root: Fields,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `path`, creating intermediate levels.
    ///
    /// A non-object value found on the way is replaced by an object.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut segments = path.split('.').peekable();
        let mut current = &mut self.root;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                current.insert(segment.to_string(), value);
                return;
            }
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Fields::new()));
            if !slot.is_object() {
                *slot = Value::Object(Fields::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => unreachable!("slot was just made an object"),
            };
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get_mut(segments.next()?)?;
        for segment in segments {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Remove and return the value at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            Some((parent, leaf)) => self.get_mut(parent)?.as_object_mut()?.remove(leaf),
            None => self.root.remove(path),
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.root.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_i64()
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    pub fn get_object(&self, path: &str) -> Option<&Fields> {
        self.get(path)?.as_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_levels() {
        let mut r = StorageRegistry::new();
        r.set("fetch.data.title", "Foo");
        assert_eq!(r.get_str("fetch.data.title"), Some("Foo"));
        assert!(r.get_object("fetch.data").is_some());
        assert!(r.has("fetch"));
    }

    #[test]
    fn absent_is_distinct_from_null() {
        let mut r = StorageRegistry::new();
        r.set("fetch.data.slug", Value::Null);
        assert_eq!(r.get("fetch.data.slug"), Some(&Value::Null));
        assert!(r.has("fetch.data.slug"));
        assert_eq!(r.get("fetch.data.title"), None);
        assert!(!r.has("fetch.data.title"));
    }

    #[test]
    fn get_object_then_dotted_read() {
        let mut r = StorageRegistry::new();
        r.set("foo", json!({"title": "Foo"}));
        r.set("bar", json!({"title": "Bar"}));
        assert_eq!(r.get_object("foo").unwrap()["title"], json!("Foo"));
        assert_eq!(r.get_str("foo.title"), Some("Foo"));
        assert_eq!(r.get_str("bar.title"), Some("Bar"));
    }

    #[test]
    fn slash_segments_address_collection_children() {
        let mut r = StorageRegistry::new();
        r.set("fetch.data", json!({"foo/zed": {"title": "Zed"}}));
        r.set("fetch.data.foo/zed.title", "X");
        assert_eq!(r.get_str("fetch.data.foo/zed.title"), Some("X"));
        assert_eq!(r.get_object("fetch.data").unwrap().len(), 1);
    }

    #[test]
    fn set_replaces_scalar_intermediates() {
        let mut r = StorageRegistry::new();
        r.set("a", 1);
        r.set("a.b", 2);
        assert_eq!(r.get_i64("a.b"), Some(2));
    }

    #[test]
    fn reading_through_a_scalar_is_absent() {
        let mut r = StorageRegistry::new();
        r.set("a", "text");
        assert!(r.get("a.b").is_none());
    }

    #[test]
    fn remove_and_clear() {
        let mut r = StorageRegistry::new();
        r.set("create.data.title", "T");
        r.set("create.id", "foo");
        assert_eq!(r.remove("create.data.title"), Some(json!("T")));
        assert!(!r.has("create.data.title"));
        assert!(r.has("create.data"));
        r.clear();
        assert!(r.is_empty());
        assert!(!r.has("create.id"));
    }

    #[test]
    fn remove_returns_the_detached_value() {
        let mut r = StorageRegistry::new();
        r.set("create.data", json!({"a": 1}));
        r.set("create.id", "foo");
        assert_eq!(r.remove("create.data"), Some(json!({"a": 1})));
        assert_eq!(r.remove("create.data"), None);
        assert_eq!(r.get_str("create.id"), Some("foo"));
    }

    #[test]
    fn typed_accessors() {
        let mut r = StorageRegistry::new();
        r.set("n", 42);
        r.set("flag", true);
        assert_eq!(r.get_i64("n"), Some(42));
        assert_eq!(r.get_bool("flag"), Some(true));
    }
}

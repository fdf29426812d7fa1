//! Fetch options and result shapes.

use folio_types::{get_path, Fields, FlatFields, Value};

/// Fetch mode switches and collection arrangement.
///
/// `sort_by`, `descending`, `offset` and `limit` only apply to collections
/// and run after the collection hooks, in that order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Return the descendant entries instead of the entry itself.
    pub collection: bool,
    /// With `collection`, include every descendant rather than direct children.
    pub recursive: bool,
    /// Dotted field path to order the collection by.
    pub sort_by: Option<String>,
    pub descending: bool,
    /// Entries to skip after sorting.
    pub offset: usize,
    /// Maximum number of entries to keep after `offset`.
    pub limit: Option<usize>,
}

impl FetchOptions {
    pub fn single() -> Self {
        Self::default()
    }

    pub fn collection() -> Self {
        Self {
            collection: true,
            ..Self::default()
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Apply the arrangement switches to `collection`.
    pub fn arrange(&self, mut collection: Collection) -> Collection {
        if let Some(field) = &self.sort_by {
            collection = collection.sort_by(field);
        }
        if self.descending {
            collection = collection.reverse();
        }
        collection = collection.skip(self.offset);
        match self.limit {
            Some(n) => collection.limit(n),
            None => collection,
        }
    }
}

/// Descendant entries with their enriched fields.
///
/// Entries are kept in id order until rearranged with [`sort_by`],
/// [`reverse`], [`skip`] or [`limit`].
///
/// [`sort_by`]: Collection::sort_by
/// [`reverse`]: Collection::reverse
/// [`skip`]: Collection::skip
/// [`limit`]: Collection::limit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    entries: Vec<(String, Fields)>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `id`, keeping id order.
    pub fn insert(&mut self, id: impl Into<String>, fields: Fields) {
        let id = id.into();
        match self.entries.binary_search_by(|(k, _)| k.as_str().cmp(&id)) {
            Ok(i) => self.entries[i].1 = fields,
            Err(i) => self.entries.insert(i, (id, fields)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Fields> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, f)| f)
    }

    /// Look up `"<child id>.<field path>"`, e.g. `foo/zed.title`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let (id, field) = path.split_once('.')?;
        get_path(self.get(id)?, field)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fields)> {
        self.entries.iter().map(|(id, f)| (id.as_str(), f))
    }

    /// Order by the value of `field`; missing values sort first. Stable, so
    /// ties keep their current order.
    pub fn sort_by(mut self, field: &str) -> Self {
        self.entries
            .sort_by(|(_, a), (_, b)| compare(get_path(a, field), get_path(b, field)));
        self
    }

    pub fn reverse(mut self) -> Self {
        self.entries.reverse();
        self
    }

    /// Drop the first `n` entries.
    pub fn skip(mut self, n: usize) -> Self {
        let n = n.min(self.entries.len());
        self.entries = self.entries.split_off(n);
        self
    }

    /// Keep at most the first `n` entries.
    pub fn limit(mut self, n: usize) -> Self {
        self.entries.truncate(n);
        self
    }

    /// Rebuild from the registry shape. Every value must be a mapping;
    /// the offending id is returned otherwise.
    pub(crate) fn from_fields(fields: Fields) -> Result<Self, String> {
        let mut collection = Self::new();
        for (id, value) in fields {
            match value {
                Value::Object(map) => collection.insert(id, map),
                _ => return Err(id),
            }
        }
        Ok(collection)
    }

    pub(crate) fn into_fields(self) -> Fields {
        self.entries
            .into_iter()
            .map(|(id, fields)| (id, Value::Object(fields)))
            .collect()
    }
}

impl IntoIterator for Collection {
    type Item = (String, Fields);
    type IntoIter = std::vec::IntoIter<(String, Fields)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Result of [`Entries::fetch`](crate::Entries::fetch).
///
/// The two shapes count different things: a single entry counts its leaf
/// fields, a collection counts its entries.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
    Single(FlatFields),
    Collection(Collection),
}

impl Fetched {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(flat) => flat.len(),
            Self::Collection(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dotted lookup: a leaf key for single results, `<id>.<field>` for
    /// collections.
    pub fn get(&self, path: &str) -> Option<&Value> {
        match self {
            Self::Single(flat) => flat.get(path),
            Self::Collection(c) => c.get_path(path),
        }
    }

    pub fn as_single(&self) -> Option<&FlatFields> {
        match self {
            Self::Single(flat) => Some(flat),
            Self::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(c) => Some(c),
            Self::Single(_) => None,
        }
    }

    /// JSON view used by the CLI. Collections become an array of
    /// `{id, fields}` objects so their order survives.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Single(flat) => Value::Object(flat.clone().into_iter().collect()),
            Self::Collection(c) => Value::Array(
                c.iter()
                    .map(|(id, fields)| serde_json::json!({ "id": id, "fields": fields }))
                    .collect(),
            ),
        }
    }
}

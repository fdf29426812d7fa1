//! Hierarchical entry identifiers.
//!
//! Valid ids:
//! - Are non-empty once surrounding slashes are trimmed
//! - Consist of `/`-separated, non-empty segments
//! - Never contain `.` (the storage registry uses it as its path separator,
//!   and it rules out `.`/`..` traversal segments)
//! - Never contain whitespace, `\`, `:`, `~`, `*`, `?` or control characters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that are forbidden anywhere in an entry id.
const FORBIDDEN_CHARS: &[char] = &['.', '\\', ':', '~', '*', '?', '"', '<', '>', '|'];

/// Unique, slash-delimited name of an entry (`blog/2024/hello`).
///
/// An `EntryId` is always normalized: no leading or trailing slash, no empty
/// segments. Construction is the only place ids are validated, so every
/// `EntryId` in the system is safe to join onto a storage root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

impl EntryId {
    /// Parse and normalize an id.
    pub fn new(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(TypeError::invalid_id(raw, "id must not be empty"));
        }

        if let Some(ch) = trimmed
            .chars()
            .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_whitespace() || c.is_control())
        {
            return Err(TypeError::invalid_id(
                raw,
                format!("contains forbidden character: {ch:?}"),
            ));
        }

        if trimmed.split('/').any(str::is_empty) {
            return Err(TypeError::invalid_id(
                raw,
                "segments must not be empty",
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The final segment (`hello` for `blog/2024/hello`).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The parent id, or `None` for a top-level entry.
    pub fn parent(&self) -> Option<EntryId> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Append a single child segment.
    pub fn join(&self, segment: &str) -> Result<EntryId, TypeError> {
        Self::new(&format!("{}/{}", self.0, segment))
    }

    /// Returns `true` if `self` is a strict descendant of `other`.
    pub fn is_descendant_of(&self, other: &EntryId) -> bool {
        self.0
            .strip_prefix(other.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntryId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntryId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl TryFrom<&str> for EntryId {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn surrounding_slashes_are_trimmed() {
        let id = EntryId::new("/blog/hello/").unwrap();
        assert_eq!(id.as_str(), "blog/hello");
    }

    #[test]
    fn rejects_empty() {
        assert!(EntryId::new("").is_err());
        assert!(EntryId::new("///").is_err());
    }

    #[test]
    fn rejects_traversal() {
        assert!(EntryId::new("../etc/passwd").is_err());
        assert!(EntryId::new("blog/../../x").is_err());
        assert!(EntryId::new("blog/./x").is_err());
        assert!(EntryId::new("blog\\x").is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        let err = EntryId::new("blog//hello").unwrap_err();
        assert!(matches!(err, TypeError::InvalidId { .. }));
    }

    #[test]
    fn name_and_parent() {
        let id = EntryId::new("blog/2024/hello").unwrap();
        assert_eq!(id.name(), "hello");
        assert_eq!(id.parent().unwrap().as_str(), "blog/2024");
        assert_eq!(id.depth(), 3);
        assert!(EntryId::new("blog").unwrap().parent().is_none());
    }

    #[test]
    fn descendant_check_respects_segment_boundaries() {
        let foo = EntryId::new("foo").unwrap();
        assert!(EntryId::new("foo/bar").unwrap().is_descendant_of(&foo));
        assert!(!EntryId::new("foobar").unwrap().is_descendant_of(&foo));
        assert!(!foo.is_descendant_of(&foo));
    }

    #[test]
    fn join_validates_segment() {
        let foo = EntryId::new("foo").unwrap();
        assert_eq!(foo.join("bar").unwrap().as_str(), "foo/bar");
        assert!(foo.join("..").is_err());
    }

    #[test]
    fn serde_rejects_invalid() {
        let parsed: Result<EntryId, _> = serde_json::from_str("\"a/../b\"");
        assert!(parsed.is_err());
        let ok: EntryId = serde_json::from_str("\"a/b\"").unwrap();
        assert_eq!(ok.name(), "b");
    }

    proptest! {
        #[test]
        fn valid_ids_never_contain_dots(raw in "[a-z0-9/._-]{0,24}") {
            if let Ok(id) = EntryId::new(&raw) {
                prop_assert!(!id.as_str().contains('.'));
                prop_assert!(!id.as_str().starts_with('/'));
                prop_assert!(id.segments().all(|s| !s.is_empty()));
            }
        }
    }
}

use std::fmt;

use folio_types::EntryId;

use crate::fingerprint::{Fingerprint, Fingerprinter};

/// What kind of result a cache entry holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Decoded raw fields of a single document.
    Document,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
        }
    }
}

/// Cache key: `(id, operation kind, fingerprint)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub id: EntryId,
    pub kind: OperationKind,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(id: EntryId, kind: OperationKind, fingerprint: Fingerprint) -> Self {
        Self {
            id,
            kind,
            fingerprint,
        }
    }

    /// Flat string used by backends to address the entry.
    pub fn storage_key(&self) -> String {
        let kind = self.kind.to_string();
        Fingerprinter::KEY
            .parts(&[
                self.id.as_str().as_bytes(),
                kind.as_bytes(),
                self.fingerprint.as_bytes(),
            ])
            .to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(tag: &[u8]) -> Fingerprint {
        Fingerprinter::ENTRY.parts(&[tag])
    }

    #[test]
    fn storage_key_depends_on_every_component() {
        let id = EntryId::new("foo").unwrap();
        let base = CacheKey::new(id.clone(), OperationKind::Document, fp(b"1"));
        let other_fp = CacheKey::new(id, OperationKind::Document, fp(b"2"));
        let other_id = CacheKey::new(EntryId::new("bar").unwrap(), OperationKind::Document, fp(b"1"));

        assert_ne!(base.storage_key(), other_fp.storage_key());
        assert_ne!(base.storage_key(), other_id.storage_key());
        assert_eq!(base.storage_key().len(), 32);
    }
}

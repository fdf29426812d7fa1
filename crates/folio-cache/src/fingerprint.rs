use std::fmt;

use folio_store::FileStamp;
use folio_types::EntryId;

/// Length of a fingerprint in bytes (32 hex characters).
pub const FINGERPRINT_LEN: usize = 16;

/// Fixed-length identifier of an entry's on-disk state.
///
/// Changes whenever the document's modification time or size changes, which
/// is what invalidates earlier cache entries: stale keys are simply never
/// asked for again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Hex-encoded representation (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Domain-separated BLAKE3 hasher for cache fingerprints and keys.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a fingerprint and a storage key over identical input
/// never collide.
pub struct Fingerprinter {
    domain: &'static str,
}

impl Fingerprinter {
    /// Hasher for entry document fingerprints.
    pub const ENTRY: Self = Self {
        domain: "folio-entry-v1",
    };
    /// Hasher for backend storage keys.
    pub const KEY: Self = Self {
        domain: "folio-cache-key-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Fingerprint an entry from its id and file stamp.
    pub fn entry(&self, id: &EntryId, stamp: &FileStamp) -> Fingerprint {
        let mut hasher = self.start();
        hasher.update(id.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(&stamp.modified_nanos().to_le_bytes());
        hasher.update(&stamp.len.to_le_bytes());
        truncate(hasher)
    }

    /// Hash arbitrary parts, each length-prefixed.
    pub fn parts(&self, parts: &[&[u8]]) -> Fingerprint {
        let mut hasher = self.start();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        truncate(hasher)
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

fn truncate(hasher: blake3::Hasher) -> Fingerprint {
    let mut out = [0u8; FINGERPRINT_LEN];
    out.copy_from_slice(&hasher.finalize().as_bytes()[..FINGERPRINT_LEN]);
    Fingerprint(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn stamp(secs: u64, len: u64) -> FileStamp {
        FileStamp {
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            len,
        }
    }

    fn id(s: &str) -> EntryId {
        EntryId::new(s).unwrap()
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = Fingerprinter::ENTRY.entry(&id("foo"), &stamp(10, 5));
        let b = Fingerprinter::ENTRY.entry(&id("foo"), &stamp(10, 5));
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 32);
    }

    #[test]
    fn fingerprint_tracks_mtime_size_and_id() {
        let base = Fingerprinter::ENTRY.entry(&id("foo"), &stamp(10, 5));
        assert_ne!(base, Fingerprinter::ENTRY.entry(&id("foo"), &stamp(11, 5)));
        assert_ne!(base, Fingerprinter::ENTRY.entry(&id("foo"), &stamp(10, 6)));
        assert_ne!(base, Fingerprinter::ENTRY.entry(&id("bar"), &stamp(10, 5)));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let a = Fingerprinter::ENTRY.parts(&[b"x"]);
        let b = Fingerprinter::KEY.parts(&[b"x"]);
        assert_ne!(a, b);
        assert_ne!(Fingerprinter::new("custom-v1").parts(&[b"x"]), a);
    }

    #[test]
    fn parts_are_length_prefixed() {
        let a = Fingerprinter::KEY.parts(&[b"ab", b"c"]);
        let b = Fingerprinter::KEY.parts(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }
}

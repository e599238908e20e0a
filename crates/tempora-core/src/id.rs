//! Identity newtypes for versioned graph entities.
//!
//! A [`NanoId`] names one logical entity (node, edge, or component) for its
//! whole lifetime. A [`Locator`] pins one specific version of that entity and
//! is the primary key of every versioned row.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// URL-safe alphabet used for generated ids.
const ALPHABET: &[u8; 64] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a generated id. 21 symbols of 6 bits gives ~126 bits of entropy.
const ID_LENGTH: usize = 21;

/// The first version of every entity.
pub const FIRST_VERSION: u32 = 1;

/// Opaque random identifier shared by every version of one logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NanoId(String);

impl NanoId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ID_LENGTH)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        NanoId(id)
    }

    /// Wraps an existing id, e.g. one read back from storage.
    pub fn new(id: impl Into<String>) -> Self {
        NanoId(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NanoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(id, version)` key of one specific entity version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locator {
    pub id: NanoId,
    pub version: u32,
}

impl Locator {
    /// Creates a locator for an explicit version.
    pub fn new(id: NanoId, version: u32) -> Self {
        Locator { id, version }
    }

    /// Mints a brand-new entity: fresh id at the first version.
    pub fn generate() -> Self {
        Locator::first(NanoId::generate())
    }

    /// The first version of `id`.
    pub fn first(id: NanoId) -> Self {
        Locator {
            id,
            version: FIRST_VERSION,
        }
    }

    /// The next version of the same entity.
    pub fn increment(&self) -> Self {
        Locator {
            id: self.id.clone(),
            version: self.version + 1,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_url_safe_and_sized() {
        let id = NanoId::generate();
        assert_eq!(id.as_str().len(), ID_LENGTH);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<NanoId> = (0..1000).map(|_| NanoId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn locator_generate_starts_at_first_version() {
        let locator = Locator::generate();
        assert_eq!(locator.version, FIRST_VERSION);
    }

    #[test]
    fn locator_increment_keeps_id() {
        let first = Locator::first(NanoId::new("abc"));
        let second = first.increment();
        assert_eq!(second.id, first.id);
        assert_eq!(second.version, 2);
        assert_eq!(second.increment().version, 3);
    }

    #[test]
    fn locator_display() {
        let locator = Locator::new(NanoId::new("n1"), 4);
        assert_eq!(format!("{}", locator), "n1@v4");
    }

    #[test]
    fn nano_id_serializes_as_plain_string() {
        let id = NanoId::new("xyz");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"xyz\"");
        let back: NanoId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

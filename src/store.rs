use indexmap::IndexMap;

use crate::data::{CandidateKind, Collection, GenArena, GenId, GenParticle};
use crate::{OleanderError, OleanderResult};

/// The event-scoped heterogeneous store shared by every module in the pipeline.
///
/// Collections are keyed by name, hold exactly one concrete candidate kind
/// fixed at [`put`](EventStore::put) time, and are write-once for the lifetime
/// of an event. The store also owns the generator-particle arena that
/// candidate back-references point into, so clearing the store at the event
/// boundary invalidates every weak reference at once.
#[derive(Debug, Default)]
pub struct EventStore {
    entries: IndexMap<String, Collection>,
    gen: GenArena,
    next_uid: u32,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a collection under `key`, failing if the key is already taken.
    pub fn put<K: Into<String>>(&mut self, key: K, collection: Collection) -> OleanderResult<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(OleanderError::DuplicateKey { key });
        }
        self.entries.insert(key, collection);
        Ok(())
    }

    /// Retrieve the collection stored under `key` as a slice of candidates of
    /// kind `T`, failing if the key is absent or holds a different kind.
    pub fn get<T: CandidateKind>(&self, key: &str) -> OleanderResult<&[T]> {
        let collection = self
            .entries
            .get(key)
            .ok_or_else(|| OleanderError::MissingKey {
                key: key.to_string(),
            })?;
        T::slice(collection).ok_or_else(|| OleanderError::TypeMismatch {
            key: key.to_string(),
            expected: T::KIND,
            found: collection.kind(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Names of all stored collections, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a generator-level particle to the event arena and return its handle.
    pub fn add_gen(&mut self, particle: GenParticle) -> GenId {
        self.gen.insert(particle)
    }

    /// Look up a generator-level particle by handle.
    pub fn gen(&self, id: GenId) -> Option<&GenParticle> {
        self.gen.get(id)
    }

    /// Issue a fresh per-event candidate identity for ingestion.
    pub fn issue_uid(&mut self) -> u32 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Drop all collections, arena contents, and identities for the next event.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.gen.clear();
        self.next_uid = 0;
    }
}

//! The storage contracts for versioned graph entities.
//!
//! Two-layer API design:
//! - [`VersionedStore`] persists every version of one entity family, keyed by
//!   locator. Default methods derive the point-in-time selections from
//!   `find_all`; backends override them where they can query directly.
//! - [`GraphStore`] groups the node, edge, and component stores and runs
//!   batches of writes atomically.
//!
//! All backends (InMemoryGraphStore, SqliteGraphStore) implement these traits
//! with identical semantics, so they are fully swappable.

use tempora_core::version;
use tempora_core::{Component, Edge, Locator, NanoId, Node, Timestamp};

use crate::error::StorageError;
use crate::record::Record;

/// Persistence for every version of one entity family.
pub trait VersionedStore<T: Record> {
    /// Inserts or replaces the version at `value`'s locator. Returns the
    /// value as stored (detached).
    fn save(&mut self, value: &T) -> Result<T, StorageError>;

    /// Every version of `id`, oldest first.
    fn find_all(&self, id: &NanoId) -> Result<Vec<T>, StorageError>;

    /// The version at exactly `locator`.
    fn find(&self, locator: &Locator) -> Result<Option<T>, StorageError>;

    /// Removes every version of `id`. Returns `false` if there were none.
    fn delete(&mut self, id: &NanoId) -> Result<bool, StorageError>;

    /// Every distinct id, sorted.
    fn all_ids(&self) -> Result<Vec<NanoId>, StorageError>;

    /// Every stored version of every id.
    fn load_all(&self) -> Result<Vec<T>, StorageError>;

    /// The active version of `id`.
    fn find_active(&self, id: &NanoId) -> Result<Option<T>, StorageError> {
        let all = self.find_all(id)?;
        Ok(version::find_active(id, &all).cloned())
    }

    /// The version of `id` valid at `timestamp`.
    fn find_at(&self, id: &NanoId, timestamp: Timestamp) -> Result<Option<T>, StorageError> {
        let all = self.find_all(id)?;
        Ok(version::find_at(id, timestamp, &all).cloned())
    }

    /// Closes the active version of `id` at `timestamp`. Returns `false` when
    /// `id` has no active version.
    fn expire(&mut self, id: &NanoId, timestamp: Timestamp) -> Result<bool, StorageError> {
        match self.find_active(id)? {
            Some(active) => {
                self.save(&active.close(timestamp))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Every id that has an active version, sorted.
    fn all_active_ids(&self) -> Result<Vec<NanoId>, StorageError> {
        let mut active = Vec::new();
        for id in self.all_ids()? {
            if self.find_active(&id)?.is_some() {
                active.push(id);
            }
        }
        Ok(active)
    }
}

/// The three stores that back one versioned graph.
pub trait GraphStore {
    type Nodes: VersionedStore<Node>;
    type Edges: VersionedStore<Edge>;
    type Components: VersionedStore<Component>;

    fn nodes(&self) -> &Self::Nodes;
    fn nodes_mut(&mut self) -> &mut Self::Nodes;
    fn edges(&self) -> &Self::Edges;
    fn edges_mut(&mut self) -> &mut Self::Edges;
    fn components(&self) -> &Self::Components;
    fn components_mut(&mut self) -> &mut Self::Components;

    /// Runs `f` as one unit: either every write it makes lands or none do.
    fn atomically<R, F>(&mut self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut Self) -> Result<R, StorageError>;
}

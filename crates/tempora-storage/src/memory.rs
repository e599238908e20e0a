//! In-memory implementation of [`VersionedStore`] and [`GraphStore`].
//!
//! [`InMemoryGraphStore`] is a first-class backend for tests and anywhere
//! persistence isn't needed. It stores all versions in ordered maps with
//! identical semantics to the SQLite backend. Atomic batches keep an undo
//! journal of the rows they overwrite, so rollback costs only what the batch
//! touched.

use std::collections::BTreeMap;

use tempora_core::{Component, Edge, Locator, NanoId, Node};

use crate::error::StorageError;
use crate::record::Record;
use crate::traits::{GraphStore, VersionedStore};

/// Every version of one entity family, ordered by `(id, version)`.
#[derive(Debug, Clone)]
pub struct InMemoryStore<T> {
    rows: BTreeMap<Locator, T>,
    /// Prior row per write while a batch is open; `None` means the row was
    /// absent.
    journal: Option<Vec<(Locator, Option<T>)>>,
}

/// Where an open batch started in a store's journal.
#[derive(Debug, Clone, Copy)]
struct Savepoint {
    mark: usize,
    outermost: bool,
}

impl<T> InMemoryStore<T> {
    pub fn new() -> Self {
        InMemoryStore {
            rows: BTreeMap::new(),
            journal: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn span(id: &NanoId) -> std::ops::RangeInclusive<Locator> {
        Locator::new(id.clone(), 0)..=Locator::new(id.clone(), u32::MAX)
    }

    fn record(&mut self, locator: Locator, previous: Option<T>) {
        if let Some(journal) = &mut self.journal {
            journal.push((locator, previous));
        }
    }

    fn begin(&mut self) -> Savepoint {
        if let Some(journal) = &self.journal {
            return Savepoint {
                mark: journal.len(),
                outermost: false,
            };
        }
        self.journal = Some(Vec::new());
        Savepoint {
            mark: 0,
            outermost: true,
        }
    }

    /// Keeps the batch's writes. An enclosing batch still holds their undo
    /// entries.
    fn commit(&mut self, savepoint: Savepoint) {
        if savepoint.outermost {
            self.journal = None;
        }
    }

    /// Undoes every write made since `savepoint`, newest first.
    fn rollback(&mut self, savepoint: Savepoint) {
        let undo = match &mut self.journal {
            Some(journal) => journal.split_off(savepoint.mark),
            None => Vec::new(),
        };
        for (locator, previous) in undo.into_iter().rev() {
            match previous {
                Some(row) => {
                    self.rows.insert(locator, row);
                }
                None => {
                    self.rows.remove(&locator);
                }
            }
        }
        if savepoint.outermost {
            self.journal = None;
        }
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        InMemoryStore::new()
    }
}

impl<T: Record> VersionedStore<T> for InMemoryStore<T> {
    fn save(&mut self, value: &T) -> Result<T, StorageError> {
        let stored = value.detach();
        let locator = stored.locator().clone();
        let previous = self.rows.insert(locator.clone(), stored.clone());
        self.record(locator, previous);
        Ok(stored)
    }

    fn find_all(&self, id: &NanoId) -> Result<Vec<T>, StorageError> {
        Ok(self
            .rows
            .range(Self::span(id))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn find(&self, locator: &Locator) -> Result<Option<T>, StorageError> {
        Ok(self.rows.get(locator).cloned())
    }

    fn delete(&mut self, id: &NanoId) -> Result<bool, StorageError> {
        let doomed: Vec<Locator> = self
            .rows
            .range(Self::span(id))
            .map(|(l, _)| l.clone())
            .collect();
        for locator in &doomed {
            let previous = self.rows.remove(locator);
            self.record(locator.clone(), previous);
        }
        Ok(!doomed.is_empty())
    }

    fn all_ids(&self) -> Result<Vec<NanoId>, StorageError> {
        let mut ids: Vec<NanoId> = self.rows.keys().map(|l| l.id.clone()).collect();
        ids.dedup();
        Ok(ids)
    }

    fn load_all(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.rows.values().cloned().collect())
    }
}

/// Node, edge, and component stores held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    nodes: InMemoryStore<Node>,
    edges: InMemoryStore<Edge>,
    components: InMemoryStore<Component>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        InMemoryGraphStore::default()
    }
}

impl GraphStore for InMemoryGraphStore {
    type Nodes = InMemoryStore<Node>;
    type Edges = InMemoryStore<Edge>;
    type Components = InMemoryStore<Component>;

    fn nodes(&self) -> &Self::Nodes {
        &self.nodes
    }

    fn nodes_mut(&mut self) -> &mut Self::Nodes {
        &mut self.nodes
    }

    fn edges(&self) -> &Self::Edges {
        &self.edges
    }

    fn edges_mut(&mut self) -> &mut Self::Edges {
        &mut self.edges
    }

    fn components(&self) -> &Self::Components {
        &self.components
    }

    fn components_mut(&mut self) -> &mut Self::Components {
        &mut self.components
    }

    /// Journals the rows `f` overwrites and restores them if it fails.
    fn atomically<R, F>(&mut self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut Self) -> Result<R, StorageError>,
    {
        let savepoints = (self.nodes.begin(), self.edges.begin(), self.components.begin());
        let result = f(self);
        let (nodes, edges, components) = savepoints;
        if result.is_ok() {
            self.nodes.commit(nodes);
            self.edges.commit(edges);
            self.components.commit(components);
        } else {
            self.nodes.rollback(nodes);
            self.edges.rollback(edges);
            self.components.rollback(components);
        }
        result
    }
}

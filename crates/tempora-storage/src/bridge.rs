//! Change bridge from the live graph to a [`GraphStore`].
//!
//! [`DelegatedChangeSink`] receives the structural events drained from a
//! [`VersionedGraph`](tempora_core::VersionedGraph) and turns each into a
//! [`PendingWrite`]. [`DelegatedChangeSink::flush`] applies the queue in
//! emission order as one atomic batch.

use chrono::Utc;
use tracing::{debug, warn};

use tempora_core::{Edge, GraphChangeSink, GraphEvent, NanoId, Node, Timestamp};

use crate::error::StorageError;
use crate::traits::{GraphStore, VersionedStore};

/// One store write produced by a graph event.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    SaveNode(Node),
    ExpireNode { id: NanoId, at: Timestamp },
    SaveEdge(Edge),
    ExpireEdge { id: NanoId, at: Timestamp },
}

impl PendingWrite {
    /// Applies this write to `store`.
    ///
    /// Expiring an id with no active version in the store means the store
    /// and the live graph have diverged, reported as
    /// [`StorageError::IntegrityError`].
    pub fn apply<S: GraphStore>(&self, store: &mut S) -> Result<(), StorageError> {
        match self {
            PendingWrite::SaveNode(node) => {
                store.nodes_mut().save(node)?;
            }
            PendingWrite::SaveEdge(edge) => {
                store.edges_mut().save(edge)?;
            }
            PendingWrite::ExpireNode { id, at } => {
                if !store.nodes_mut().expire(id, *at)? {
                    return Err(StorageError::IntegrityError {
                        reason: format!("node {} has no active version to expire", id),
                    });
                }
            }
            PendingWrite::ExpireEdge { id, at } => {
                if !store.edges_mut().expire(id, *at)? {
                    return Err(StorageError::IntegrityError {
                        reason: format!("edge {} has no active version to expire", id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A [`GraphChangeSink`] that defers every change as a [`PendingWrite`].
#[derive(Debug, Default)]
pub struct DelegatedChangeSink {
    queue: Vec<PendingWrite>,
}

impl DelegatedChangeSink {
    pub fn new() -> Self {
        DelegatedChangeSink::default()
    }

    /// Dispatches each event into the queue. Events carrying an Unloaded
    /// reference have nothing to persist and are skipped.
    pub fn publish<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = GraphEvent>,
    {
        for event in events {
            if !event.dispatch(self) {
                warn!(?event, "change bridge ignored an unloaded reference");
            }
        }
    }

    /// Writes queued and not yet flushed.
    pub fn pending(&self) -> &[PendingWrite] {
        &self.queue
    }

    /// Applies every queued write to `store` in one atomic batch.
    ///
    /// The queue is emptied before the batch runs, so a failed batch is not
    /// retried by the next flush. Returns the number of writes applied.
    pub fn flush<S: GraphStore>(&mut self, store: &mut S) -> Result<usize, StorageError> {
        let batch = std::mem::take(&mut self.queue);
        if batch.is_empty() {
            return Ok(0);
        }
        store.atomically(|s| {
            for write in &batch {
                write.apply(s)?;
            }
            Ok(())
        })?;
        debug!(writes = batch.len(), "flushed graph changes");
        Ok(batch.len())
    }
}

impl GraphChangeSink for DelegatedChangeSink {
    fn vertex_added(&mut self, node: &Node) {
        self.queue.push(PendingWrite::SaveNode(node.detached()));
    }

    fn vertex_removed(&mut self, node: &Node) {
        self.queue.push(PendingWrite::ExpireNode {
            id: node.locator.id.clone(),
            at: node.expired.unwrap_or_else(Utc::now),
        });
    }

    fn edge_added(&mut self, edge: &Edge) {
        self.queue.push(PendingWrite::SaveEdge(edge.detached()));
    }

    fn edge_removed(&mut self, edge: &Edge) {
        self.queue.push(PendingWrite::ExpireEdge {
            id: edge.locator.id.clone(),
            at: edge.expired.unwrap_or_else(Utc::now),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGraphStore;
    use chrono::{DateTime, TimeZone};
    use tempora_core::{Data, VersionedGraph};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn events_become_writes_in_order() {
        let mut graph = VersionedGraph::new();
        let a = graph.add_node(Data::empty(), at(0));
        let b = graph.add_node(Data::empty(), at(0));
        let e = graph.add_edge(&a, &b, Data::empty(), at(1)).unwrap();
        graph.expire_edge(&e.locator.id, at(2)).unwrap();

        let mut sink = DelegatedChangeSink::new();
        sink.publish(graph.drain_events());

        let pending = sink.pending();
        assert_eq!(pending.len(), 4);
        assert!(matches!(&pending[0], PendingWrite::SaveNode(n) if n.locator == a.locator));
        assert!(matches!(&pending[2], PendingWrite::SaveEdge(s) if !s.source.is_loaded()));
        match &pending[3] {
            PendingWrite::ExpireEdge { id, at: when } => {
                assert_eq!(id, &e.locator.id);
                assert_eq!(*when, at(2));
            }
            other => panic!("expected ExpireEdge, got {:?}", other),
        }
    }

    #[test]
    fn flush_applies_and_clears() {
        let mut graph = VersionedGraph::new();
        let a = graph.add_node(Data::empty(), at(0));
        graph.update_node(&a.locator.id, Data::new("n", serde_json::json!(2)), at(5)).unwrap();

        let mut sink = DelegatedChangeSink::new();
        sink.publish(graph.drain_events());
        let mut store = InMemoryGraphStore::new();

        assert_eq!(sink.flush(&mut store).unwrap(), 3);
        assert!(sink.pending().is_empty());
        assert_eq!(sink.flush(&mut store).unwrap(), 0);

        let versions = store.nodes().find_all(&a.locator.id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].expired, Some(at(5)));
        assert!(versions[1].expired.is_none());
    }

    #[test]
    fn diverged_store_fails_the_whole_batch() {
        let mut graph = VersionedGraph::new();
        let a = graph.add_node(Data::empty(), at(0));
        // The store never sees `a` being added.
        graph.drain_events();
        graph.add_node(Data::empty(), at(1));
        graph.expire_node(&a.locator.id, at(2)).unwrap();

        let mut sink = DelegatedChangeSink::new();
        sink.publish(graph.drain_events());
        assert_eq!(sink.pending().len(), 2);

        let mut store = InMemoryGraphStore::new();
        match sink.flush(&mut store) {
            Err(StorageError::IntegrityError { .. }) => {}
            other => panic!("expected IntegrityError, got {:?}", other),
        }
        assert!(sink.pending().is_empty());
        assert!(store.nodes().load_all().unwrap().is_empty());
    }
}

//! GraphService: the single coordinator between callers, the live versioned
//! graph, and its persistent store.
//!
//! Every mutation runs in one critical section: take the graph write lock,
//! take the store lock, mutate the live graph, publish its events into the
//! change bridge and flush them. Read-only graph queries take only the read
//! lock. Lock order is always graph, then store.
//!
//! Version lookups (`find_*`, id listings) are answered from the store, which
//! holds the full persisted history. Structural queries (neighbors, edges,
//! paths, component membership) are answered from the live graph.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use tempora_core::{
    Component, CoreError, Data, Edge, Element, Kind, Locator, NanoId, Node, Path, Timestamp,
    VersionedGraph,
};
use tempora_storage::{
    DelegatedChangeSink, GraphStore, InMemoryGraphStore, Record, SqliteGraphStore, StorageError,
    VersionedStore,
};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Names an active graph element by id when building a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Node(NanoId),
    Edge(NanoId),
}

/// The live graph together with the bridge that persists its changes.
struct LiveGraph {
    graph: VersionedGraph,
    sink: DelegatedChangeSink,
}

/// The central service over one versioned graph and its store.
pub struct GraphService<S: GraphStore> {
    live: RwLock<LiveGraph>,
    store: Mutex<S>,
}

impl GraphService<SqliteGraphStore> {
    /// Opens the SQLite store named by `config` (in memory when no path is
    /// set) and hydrates the live graph from it.
    pub fn open(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let store = match &config.db_path {
            Some(path) => SqliteGraphStore::new(path)?,
            None => SqliteGraphStore::in_memory()?,
        };
        GraphService::with_store(store)
    }
}

impl GraphService<InMemoryGraphStore> {
    /// Creates a service over empty in-memory stores.
    pub fn in_memory() -> Result<Self, ServiceError> {
        GraphService::with_store(InMemoryGraphStore::new())
    }
}

impl<S: GraphStore> GraphService<S> {
    /// Wraps `store`, rebuilding the live graph from everything it holds.
    pub fn with_store(store: S) -> Result<Self, ServiceError> {
        let graph = VersionedGraph::from_parts(
            store.nodes().load_all()?,
            store.edges().load_all()?,
            store.components().load_all()?,
        )?;
        info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "graph service ready"
        );
        Ok(GraphService {
            live: RwLock::new(LiveGraph {
                graph,
                sink: DelegatedChangeSink::new(),
            }),
            store: Mutex::new(store),
        })
    }

    /// Runs `f` with exclusive access to the graph and the store, then
    /// persists every structural change `f` made.
    ///
    /// The changes are flushed even when `f` fails part-way, so the store
    /// always mirrors the live graph. If both fail, `f`'s error is returned
    /// and the flush failure is logged.
    fn mutate<R, F>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut VersionedGraph, &mut S) -> Result<R, ServiceError>,
    {
        let mut live = self.live.write();
        let mut store = self.store.lock();
        let LiveGraph { graph, sink } = &mut *live;

        let result = f(graph, &mut *store);
        sink.publish(graph.drain_events());
        let flushed = sink.flush(&mut *store);

        match (result, flushed) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(flush_err)) => {
                error!(
                    error = %flush_err,
                    cause = %err,
                    "failed to persist changes of a failed mutation"
                );
                Err(err)
            }
        }
    }

    /// Runs a read-only query against the live graph.
    fn read<R>(
        &self,
        f: impl FnOnce(&VersionedGraph) -> Result<R, CoreError>,
    ) -> Result<R, ServiceError> {
        let live = self.live.read();
        Ok(f(&live.graph)?)
    }

    fn now() -> Timestamp {
        Utc::now()
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    pub fn add_node(&self, data: Data) -> Result<Node, ServiceError> {
        let node = self.mutate(|graph, _| Ok(graph.add_node(data, Self::now())))?;
        info!(node = %node.locator, "added node");
        Ok(node)
    }

    /// Replaces the active version of node `id`, re-wiring its edges.
    pub fn update_node(&self, id: &NanoId, data: Data) -> Result<Node, ServiceError> {
        let node = self.mutate(|graph, _| Ok(graph.update_node(id, data, Self::now())?))?;
        info!(node = %node.locator, "updated node");
        Ok(node)
    }

    /// Expires node `id` and its active edges. Returns `None` if the node has
    /// no active version.
    pub fn expire_node(&self, id: &NanoId) -> Result<Option<Node>, ServiceError> {
        let expired = self.mutate(|graph, _| {
            if graph.find_active_node(id).is_none() {
                return Ok(None);
            }
            let expired = graph.expire_node(id, Self::now())?;
            if expired.expired.is_none() {
                return Err(CoreError::InvariantViolation {
                    reason: format!("expired node {} has no expiry timestamp", expired.locator),
                }
                .into());
            }
            Ok(Some(expired))
        })?;
        if let Some(node) = &expired {
            info!(node = %node.locator, "expired node");
        }
        Ok(expired)
    }

    /// Purges every stored version of node `id`. Nodes still active in the
    /// live graph must be expired first.
    pub fn delete_node(&self, id: &NanoId) -> Result<bool, ServiceError> {
        self.mutate(|graph, store| {
            refuse_active(graph.find_active_node(id).is_some(), Kind::Node, id)?;
            Ok(store.nodes_mut().delete(id)?)
        })
    }

    pub fn find_node(&self, locator: &Locator) -> Result<Node, ServiceError> {
        self.store
            .lock()
            .nodes()
            .find(locator)?
            .ok_or_else(|| not_found(Kind::Node, locator))
    }

    pub fn find_active_node(&self, id: &NanoId) -> Result<Option<Node>, ServiceError> {
        Ok(self.store.lock().nodes().find_active(id)?)
    }

    pub fn find_node_at(
        &self,
        id: &NanoId,
        timestamp: Timestamp,
    ) -> Result<Option<Node>, ServiceError> {
        Ok(self.store.lock().nodes().find_at(id, timestamp)?)
    }

    pub fn find_node_versions(&self, id: &NanoId) -> Result<Vec<Node>, ServiceError> {
        Ok(self.store.lock().nodes().find_all(id)?)
    }

    /// Active nodes joined to the active node `id` by an active edge.
    pub fn neighbors(&self, id: &NanoId) -> Result<Vec<Node>, ServiceError> {
        self.read(|graph| graph.neighbors(&require_node(graph, id)?))
    }

    pub fn all_node_ids(&self) -> Result<Vec<NanoId>, ServiceError> {
        Ok(self.store.lock().nodes().all_ids()?)
    }

    pub fn all_active_node_ids(&self) -> Result<Vec<NanoId>, ServiceError> {
        Ok(self.store.lock().nodes().all_active_ids()?)
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Connects the active versions of two nodes.
    pub fn add_edge(
        &self,
        source: &NanoId,
        target: &NanoId,
        data: Data,
    ) -> Result<Edge, ServiceError> {
        let edge = self.mutate(|graph, _| {
            let from = require_node(graph, source)?;
            let to = require_node(graph, target)?;
            Ok(graph.add_edge(&from, &to, data, Self::now())?)
        })?;
        info!(edge = %edge.locator, "added edge");
        Ok(edge)
    }

    pub fn update_edge(&self, id: &NanoId, data: Data) -> Result<Edge, ServiceError> {
        let edge = self.mutate(|graph, _| Ok(graph.update_edge(id, data, Self::now())?))?;
        info!(edge = %edge.locator, "updated edge");
        Ok(edge)
    }

    /// Expires edge `id`. Returns `None` if the edge has no active version.
    pub fn expire_edge(&self, id: &NanoId) -> Result<Option<Edge>, ServiceError> {
        let expired = self.mutate(|graph, _| {
            if graph.find_active_edge(id).is_none() {
                return Ok(None);
            }
            Ok(Some(graph.expire_edge(id, Self::now())?))
        })?;
        if let Some(edge) = &expired {
            info!(edge = %edge.locator, "expired edge");
        }
        Ok(expired)
    }

    /// Purges every stored version of edge `id`. Edges still active in the
    /// live graph must be expired first.
    pub fn delete_edge(&self, id: &NanoId) -> Result<bool, ServiceError> {
        self.mutate(|graph, store| {
            refuse_active(graph.find_active_edge(id).is_some(), Kind::Edge, id)?;
            Ok(store.edges_mut().delete(id)?)
        })
    }

    pub fn find_edge(&self, locator: &Locator) -> Result<Edge, ServiceError> {
        self.store
            .lock()
            .edges()
            .find(locator)?
            .ok_or_else(|| not_found(Kind::Edge, locator))
    }

    pub fn find_active_edge(&self, id: &NanoId) -> Result<Option<Edge>, ServiceError> {
        Ok(self.store.lock().edges().find_active(id)?)
    }

    pub fn find_edge_at(
        &self,
        id: &NanoId,
        timestamp: Timestamp,
    ) -> Result<Option<Edge>, ServiceError> {
        Ok(self.store.lock().edges().find_at(id, timestamp)?)
    }

    pub fn find_edge_versions(&self, id: &NanoId) -> Result<Vec<Edge>, ServiceError> {
        Ok(self.store.lock().edges().find_all(id)?)
    }

    /// Active edges leaving the active node `id`.
    pub fn edges_from(&self, id: &NanoId) -> Result<Vec<Edge>, ServiceError> {
        self.read(|graph| graph.edges_from(&require_node(graph, id)?))
    }

    /// Active edges entering the active node `id`.
    pub fn edges_to(&self, id: &NanoId) -> Result<Vec<Edge>, ServiceError> {
        self.read(|graph| graph.edges_to(&require_node(graph, id)?))
    }

    pub fn all_edge_ids(&self) -> Result<Vec<NanoId>, ServiceError> {
        Ok(self.store.lock().edges().all_ids()?)
    }

    pub fn all_active_edge_ids(&self) -> Result<Vec<NanoId>, ServiceError> {
        Ok(self.store.lock().edges().all_active_ids()?)
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Creates a component over the active elements named by `elements`.
    pub fn add_component(
        &self,
        elements: &[ElementRef],
        data: Data,
    ) -> Result<Component, ServiceError> {
        let component = self.mutate(|graph, store| {
            let resolved = resolve_elements(graph, elements)?;
            let component = graph.add_component(resolved, data, Self::now())?;
            store.components_mut().save(&component)?;
            Ok(component)
        })?;
        info!(component = %component.locator, "added component");
        Ok(component)
    }

    /// Replaces the active version of component `id`. Nothing changes if the
    /// new element set is rejected.
    pub fn update_component(
        &self,
        id: &NanoId,
        elements: &[ElementRef],
        data: Data,
    ) -> Result<Component, ServiceError> {
        let component = self.mutate(|graph, store| {
            let resolved = resolve_elements(graph, elements)?;
            let next = graph.update_component(id, resolved, data, Self::now())?;
            store.atomically(|s| {
                expire_stored::<Component, _>(s.components_mut(), id, next.created)?;
                s.components_mut().save(&next)
            })?;
            Ok(next)
        })?;
        info!(component = %component.locator, "updated component");
        Ok(component)
    }

    /// Expires component `id`. Returns `None` if it has no active version.
    pub fn expire_component(&self, id: &NanoId) -> Result<Option<Component>, ServiceError> {
        let expired = self.mutate(|graph, store| {
            if graph.find_active_component(id).is_none() {
                return Ok(None);
            }
            let expired = graph.expire_component(id, Self::now())?;
            let at = expired.expired.ok_or_else(|| {
                ServiceError::from(CoreError::InvariantViolation {
                    reason: format!(
                        "expired component {} has no expiry timestamp",
                        expired.locator
                    ),
                })
            })?;
            expire_stored::<Component, _>(store.components_mut(), id, at)?;
            Ok(Some(expired))
        })?;
        if let Some(component) = &expired {
            info!(component = %component.locator, "expired component");
        }
        Ok(expired)
    }

    /// Purges every stored version of component `id`. Components still
    /// active in the live graph must be expired first.
    pub fn delete_component(&self, id: &NanoId) -> Result<bool, ServiceError> {
        self.mutate(|graph, store| {
            refuse_active(graph.find_active_component(id).is_some(), Kind::Component, id)?;
            Ok(store.components_mut().delete(id)?)
        })
    }

    pub fn find_component(&self, locator: &Locator) -> Result<Component, ServiceError> {
        self.store
            .lock()
            .components()
            .find(locator)?
            .ok_or_else(|| not_found(Kind::Component, locator))
    }

    pub fn find_active_component(&self, id: &NanoId) -> Result<Option<Component>, ServiceError> {
        Ok(self.store.lock().components().find_active(id)?)
    }

    pub fn find_component_at(
        &self,
        id: &NanoId,
        timestamp: Timestamp,
    ) -> Result<Option<Component>, ServiceError> {
        Ok(self.store.lock().components().find_at(id, timestamp)?)
    }

    pub fn find_component_versions(&self, id: &NanoId) -> Result<Vec<Component>, ServiceError> {
        Ok(self.store.lock().components().find_all(id)?)
    }

    pub fn all_component_ids(&self) -> Result<Vec<NanoId>, ServiceError> {
        Ok(self.store.lock().components().all_ids()?)
    }

    pub fn all_active_component_ids(&self) -> Result<Vec<NanoId>, ServiceError> {
        Ok(self.store.lock().components().all_active_ids()?)
    }

    /// Active components holding an active element with id `id`.
    pub fn find_active_containing(&self, id: &NanoId) -> Result<Vec<Component>, ServiceError> {
        self.read(|graph| Ok(graph.components_containing_id(id)))
    }

    /// Component versions valid at `timestamp` that held element `id`.
    pub fn find_containing(
        &self,
        id: &NanoId,
        timestamp: Timestamp,
    ) -> Result<Vec<Component>, ServiceError> {
        self.read(|graph| Ok(graph.components_containing_id_at(id, timestamp)))
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    pub fn has_path(&self, source: &NanoId, target: &NanoId) -> Result<bool, ServiceError> {
        self.read(|graph| {
            let from = require_node(graph, source)?;
            let to = require_node(graph, target)?;
            graph.has_path(&from, &to)
        })
    }

    /// Fewest-hop directed path between two active nodes; empty when none.
    pub fn shortest_path(&self, source: &NanoId, target: &NanoId) -> Result<Path, ServiceError> {
        self.read(|graph| {
            let from = require_node(graph, source)?;
            let to = require_node(graph, target)?;
            graph.shortest_path(&from, &to)
        })
    }

    pub fn active_connected(&self) -> Result<Vec<Path>, ServiceError> {
        self.read(|graph| graph.active_connected())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(kind: Kind, target: impl ToString) -> ServiceError {
    ServiceError::from(CoreError::NotFound {
        kind,
        target: target.to_string(),
    })
}

/// The active version of node `id` in the live graph.
fn require_node(graph: &VersionedGraph, id: &NanoId) -> Result<Node, CoreError> {
    graph.find_active_node(id).ok_or_else(|| CoreError::NotFound {
        kind: Kind::Node,
        target: id.to_string(),
    })
}

fn resolve_elements(
    graph: &VersionedGraph,
    elements: &[ElementRef],
) -> Result<Vec<Element>, ServiceError> {
    elements
        .iter()
        .map(|element| match element {
            ElementRef::Node(id) => graph
                .find_active_node(id)
                .map(Element::Node)
                .ok_or_else(|| not_found(Kind::Node, id)),
            ElementRef::Edge(id) => graph
                .find_active_edge(id)
                .map(Element::Edge)
                .ok_or_else(|| not_found(Kind::Edge, id)),
        })
        .collect()
}

fn refuse_active(active: bool, kind: Kind, id: &NanoId) -> Result<(), ServiceError> {
    if active {
        return Err(ServiceError::BadRequest(format!(
            "{} {} is still active; expire it before deleting",
            kind, id
        )));
    }
    Ok(())
}

/// Closes the stored active version of `id`, which must exist.
fn expire_stored<T, V>(store: &mut V, id: &NanoId, at: Timestamp) -> Result<(), StorageError>
where
    T: Record,
    V: VersionedStore<T>,
{
    if store.expire(id, at)? {
        Ok(())
    } else {
        Err(StorageError::IntegrityError {
            reason: format!("{} {} has no stored active version", T::TABLE, id),
        })
    }
}

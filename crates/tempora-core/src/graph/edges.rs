//! Edge lifecycle: copy-on-write add/update/expire and adjacency queries.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use super::VersionedGraph;
use crate::data::{Data, ElementType};
use crate::edge::Edge;
use crate::error::CoreError;
use crate::event::GraphEvent;
use crate::id::{Locator, NanoId};
use crate::node::Node;
use crate::reference::{Kind, Reference};
use crate::version::{self, Timestamp, Versioned};

impl VersionedGraph {
    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Adds a new edge from `source` to `target`.
    ///
    /// Both endpoints must be active node versions of this graph. Self-loops
    /// are rejected.
    pub fn add_edge(
        &mut self,
        source: &Node,
        target: &Node,
        data: Data,
        timestamp: Timestamp,
    ) -> Result<Edge, CoreError> {
        let from = self.endpoint(source)?;
        let to = self.endpoint(target)?;
        self.connect(from, to, Locator::generate(), ElementType::edge(), data, timestamp)
    }

    /// Replaces the active version of edge `id` with a new version holding
    /// `data`. Endpoints never change.
    pub fn update_edge(
        &mut self,
        id: &NanoId,
        data: Data,
        timestamp: Timestamp,
    ) -> Result<Edge, CoreError> {
        let (index, current) = self.active_graph_edge(id)?;
        let (from, to) = self
            .graph
            .edge_endpoints(index)
            .ok_or_else(|| CoreError::InvariantViolation {
                reason: format!("edge {} has no endpoints", current.locator),
            })?;

        self.expire_edge_at(index, timestamp)?;

        let next = Edge {
            edge_type: current.edge_type.clone(),
            ..Edge::new(
                current.locator.increment(),
                current.source.clone(),
                current.target.clone(),
                data,
                timestamp,
            )
        };
        self.insert_edge(from, to, next.clone());
        debug!(edge = %next.locator, "updated edge");
        Ok(next)
    }

    /// Expires the active version of edge `id`. Its endpoints are untouched.
    pub fn expire_edge(&mut self, id: &NanoId, timestamp: Timestamp) -> Result<Edge, CoreError> {
        let (index, _) = self.active_graph_edge(id)?;
        self.expire_edge_at(index, timestamp)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The edge version at `locator`.
    pub fn find_edge(&self, locator: &Locator) -> Result<Edge, CoreError> {
        self.edge_at(locator)
            .map(|e| self.with_membership_edge(e))
            .ok_or_else(|| CoreError::not_found(Kind::Edge, locator))
    }

    pub fn find_active_edge(&self, id: &NanoId) -> Option<Edge> {
        version::find_active(id, self.loaded_edges())
            .cloned()
            .map(|e| self.with_membership_edge(e))
    }

    pub fn find_edge_at(&self, id: &NanoId, timestamp: Timestamp) -> Option<Edge> {
        version::find_at(id, timestamp, self.loaded_edges())
            .cloned()
            .map(|e| self.with_membership_edge(e))
    }

    /// Every materialized version of edge `id`, oldest first.
    pub fn find_edge_versions(&self, id: &NanoId) -> Vec<Edge> {
        version::find_versions(id, self.loaded_edges())
            .into_iter()
            .cloned()
            .map(|e| self.with_membership_edge(e))
            .collect()
    }

    /// Every active edge version.
    pub fn active_edges(&self) -> Vec<Edge> {
        version::all_active(self.loaded_edges())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Active edges leaving `node`.
    pub fn edges_from(&self, node: &Node) -> Result<Vec<Edge>, CoreError> {
        self.active_edges_directed(node, Direction::Outgoing)
    }

    /// Active edges entering `node`.
    pub fn edges_to(&self, node: &Node) -> Result<Vec<Edge>, CoreError> {
        self.active_edges_directed(node, Direction::Incoming)
    }

    /// Active edges touching `node`, incoming then outgoing.
    pub fn edges_for(&self, node: &Node) -> Result<Vec<Edge>, CoreError> {
        let mut edges = self.edges_to(node)?;
        edges.extend(self.edges_from(node)?);
        Ok(edges)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn active_edges_directed(
        &self,
        node: &Node,
        direction: Direction,
    ) -> Result<Vec<Edge>, CoreError> {
        let index = self.vertex_of(&node.locator)?;
        Ok(self
            .graph
            .edges_directed(index, direction)
            .filter_map(|e| e.weight().as_loaded())
            .filter(|e| e.is_active())
            .cloned()
            .collect())
    }

    /// Vertex of an edge endpoint, which must be a loaded, active node.
    fn endpoint(&self, node: &Node) -> Result<NodeIndex<u32>, CoreError> {
        let index = self.vertex_of(&node.locator)?;
        match self.graph[index].as_loaded() {
            Some(current) if current.is_active() => Ok(index),
            Some(_) => Err(CoreError::InvalidEdge {
                reason: format!("endpoint {} is expired", node.locator),
            }),
            None => Err(CoreError::InvalidEdge {
                reason: format!("endpoint {} is not materialized", node.locator),
            }),
        }
    }

    /// Creates a new active edge between two vertices.
    pub(super) fn connect(
        &mut self,
        from: NodeIndex<u32>,
        to: NodeIndex<u32>,
        locator: Locator,
        edge_type: ElementType,
        data: Data,
        timestamp: Timestamp,
    ) -> Result<Edge, CoreError> {
        if from == to {
            return Err(CoreError::InvalidEdge {
                reason: format!("self-loop on {}", self.graph[from].locator()),
            });
        }
        let edge = Edge {
            edge_type,
            ..Edge::new(
                locator,
                self.graph[from].clone(),
                self.graph[to].clone(),
                data,
                timestamp,
            )
        };
        self.insert_edge(from, to, edge.clone());
        Ok(edge)
    }

    fn insert_edge(&mut self, from: NodeIndex<u32>, to: NodeIndex<u32>, edge: Edge) {
        let locator = edge.locator.clone();
        let index = self.graph.add_edge(from, to, Reference::Loaded(edge.clone()));
        self.edges.insert(locator, index);
        debug!(edge = %edge.locator, "added edge");
        self.events.push(GraphEvent::EdgeAdded(Reference::Loaded(edge)));
    }

    /// Swaps the edge at `index` for its expired copy.
    pub(super) fn expire_edge_at(
        &mut self,
        index: EdgeIndex<u32>,
        timestamp: Timestamp,
    ) -> Result<Edge, CoreError> {
        let current = self
            .graph
            .edge_weight(index)
            .and_then(Reference::as_loaded)
            .cloned()
            .ok_or_else(|| CoreError::InvariantViolation {
                reason: format!("graph edge {} is not materialized", index.index()),
            })?;
        let expired = current.expire_at(timestamp);
        if let Some(weight) = self.graph.edge_weight_mut(index) {
            *weight = Reference::Loaded(expired.clone());
        }
        debug!(edge = %expired.locator, "expired edge");
        self.events
            .push(GraphEvent::EdgeRemoved(Reference::Loaded(expired.clone())));
        Ok(expired)
    }
}

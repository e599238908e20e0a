//! VersionedGraph: the live directed multigraph of node and edge versions.
//!
//! [`VersionedGraph`] is the single entry point for mutating and querying the
//! versioned graph. Vertices are `Reference<Node>` and edges are
//! `Reference<Edge>`, stored in a petgraph `StableGraph` so that indices stay
//! valid across removals.
//!
//! # Locator-keyed arena
//!
//! Every node and edge version that has ever been materialized keeps its own
//! vertex or graph edge, found through a `Locator -> index` map. Entity values
//! are immutable, so expiring a version replaces the weight at its index with
//! the expired copy. The index and the incident edges do not move.
//!
//! # Change log
//!
//! Mutations append [`GraphEvent`]s to an ordered log, drained by the caller
//! with [`VersionedGraph::drain_events`] and handed to a persistence bridge.
//! Read-only queries never touch the log. Component operations do not emit
//! events because components are not vertices or edges.
//!
//! # Concurrency
//!
//! Nothing here synchronizes. Callers must serialize mutations; immutable
//! borrows can be shared freely.

mod components;
mod edges;
mod nodes;
mod paths;
mod validate;

use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use tracing::debug;

use crate::component::Component;
use crate::edge::Edge;
use crate::element::Element;
use crate::error::CoreError;
use crate::event::GraphEvent;
use crate::id::{Locator, NanoId};
use crate::node::Node;
use crate::reference::{Kind, Reference};
use crate::version::{self, Versioned};

pub(crate) use components::ComponentIndex;

/// The live versioned graph plus its component side-tables.
#[derive(Debug, Clone, Default)]
pub struct VersionedGraph {
    graph: StableGraph<Reference<Node>, Reference<Edge>, Directed, u32>,
    /// Vertex of every materialized node version.
    vertices: HashMap<Locator, NodeIndex<u32>>,
    /// Graph edge of every materialized edge version.
    edges: HashMap<Locator, EdgeIndex<u32>>,
    components: ComponentIndex,
    events: Vec<GraphEvent>,
}

impl VersionedGraph {
    pub fn new() -> Self {
        VersionedGraph::default()
    }

    /// Rebuilds a graph from persisted versions without emitting events.
    ///
    /// Edge endpoints whose node version is not among `nodes` become unloaded
    /// placeholder vertices. Edge endpoints and component elements are
    /// resolved against the rebuilt graph with [`Reference::load`].
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        components: Vec<Component>,
    ) -> Result<Self, CoreError> {
        let mut graph = VersionedGraph::new();

        for node in nodes {
            if graph.vertices.contains_key(&node.locator) {
                continue;
            }
            let locator = node.locator.clone();
            let index = graph.graph.add_node(Reference::Loaded(node));
            graph.vertices.insert(locator, index);
        }

        for mut edge in edges {
            if graph.edges.contains_key(&edge.locator) {
                continue;
            }
            if edge.source.locator() == edge.target.locator() {
                return Err(CoreError::InvariantViolation {
                    reason: format!("stored edge {} is a self-loop", edge.locator),
                });
            }
            let source = graph.vertex_or_placeholder(&edge.source);
            let target = graph.vertex_or_placeholder(&edge.target);
            edge.source = edge.source.load(|l| graph.node_at(l));
            edge.target = edge.target.load(|l| graph.node_at(l));
            let locator = edge.locator.clone();
            let index = graph.graph.add_edge(source, target, Reference::Loaded(edge));
            graph.edges.insert(locator, index);
        }

        let mut components = components;
        components.sort_by(|a, b| a.locator.cmp(&b.locator));
        for mut component in components {
            component.elements = component
                .elements
                .iter()
                .map(|element| element.load(|l| graph.element_at(l)))
                .collect();
            graph.components.push(component);
        }
        graph.components.rebuild_membership();

        debug!(
            vertices = graph.graph.node_count(),
            edges = graph.graph.edge_count(),
            "hydrated versioned graph"
        );
        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Number of materialized vertices (every version, active or not).
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of materialized graph edges (every version, active or not).
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Events emitted since the last drain, in order.
    pub fn pending_events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Takes every event emitted since the last drain, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Internal lookups
    // -----------------------------------------------------------------------

    fn loaded_nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph
            .node_indices()
            .filter_map(move |i| self.graph[i].as_loaded())
    }

    fn loaded_edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph
            .edge_indices()
            .filter_map(move |i| self.graph[i].as_loaded())
    }

    fn node_at(&self, locator: &Locator) -> Option<Node> {
        self.vertices
            .get(locator)
            .and_then(|&i| self.graph[i].as_loaded())
            .cloned()
    }

    fn edge_at(&self, locator: &Locator) -> Option<Edge> {
        self.edges
            .get(locator)
            .and_then(|&i| self.graph[i].as_loaded())
            .cloned()
    }

    fn element_at(&self, locator: &Locator) -> Option<Element> {
        self.node_at(locator)
            .map(Element::Node)
            .or_else(|| self.edge_at(locator).map(Element::Edge))
    }

    /// Vertex of `node`, failing with `NotFound` if it was never materialized.
    fn vertex_of(&self, node: &Locator) -> Result<NodeIndex<u32>, CoreError> {
        self.vertices
            .get(node)
            .copied()
            .ok_or_else(|| CoreError::not_found(Kind::Node, node))
    }

    /// Vertex and value of the active version of node `id`.
    fn active_vertex(&self, id: &NanoId) -> Result<(NodeIndex<u32>, Node), CoreError> {
        let node = version::require_active(
            version::find_active(id, self.loaded_nodes()).cloned(),
            id,
            Kind::Node,
        )?;
        let index = self.vertex_of(&node.locator)?;
        Ok((index, node))
    }

    /// Graph edge and value of the active version of edge `id`.
    fn active_graph_edge(&self, id: &NanoId) -> Result<(EdgeIndex<u32>, Edge), CoreError> {
        let edge = version::require_active(
            version::find_active(id, self.loaded_edges()).cloned(),
            id,
            Kind::Edge,
        )?;
        let index = self
            .edges
            .get(&edge.locator)
            .copied()
            .ok_or_else(|| CoreError::not_found(Kind::Edge, &edge.locator))?;
        Ok((index, edge))
    }

    /// Every graph edge touching `vertex`, incoming first.
    fn incident_edges(&self, vertex: NodeIndex<u32>) -> Vec<EdgeIndex<u32>> {
        self.graph
            .edges_directed(vertex, Direction::Incoming)
            .chain(self.graph.edges_directed(vertex, Direction::Outgoing))
            .map(|e| e.id())
            .collect()
    }

    /// `true` if the graph edge holds a loaded, active edge.
    fn is_active_edge(&self, index: EdgeIndex<u32>) -> bool {
        self.graph
            .edge_weight(index)
            .and_then(Reference::as_loaded)
            .map_or(false, |e| e.is_active())
    }

    fn vertex_or_placeholder(&mut self, node: &Reference<Node>) -> NodeIndex<u32> {
        if let Some(&index) = self.vertices.get(node.locator()) {
            return index;
        }
        let index = self.graph.add_node(node.unload());
        self.vertices.insert(node.locator().clone(), index);
        index
    }

    /// Attaches current component membership to a node or edge value.
    fn with_membership_node(&self, mut node: Node) -> Node {
        node.components = self.components.memberships(&node.locator);
        node
    }

    fn with_membership_edge(&self, mut edge: Edge) -> Edge {
        edge.components = self.components.memberships(&edge.locator);
        edge
    }
}

//! Node lifecycle: copy-on-write add/update/expire and version queries.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use super::VersionedGraph;
use crate::data::{Data, ElementType};
use crate::error::CoreError;
use crate::event::GraphEvent;
use crate::id::{Locator, NanoId};
use crate::node::Node;
use crate::reference::{Kind, Reference};
use crate::version::{self, Timestamp, Versioned};

/// An active edge of a node that is being revised, captured so it can be
/// re-created against the new node version.
struct Rewire {
    other: NodeIndex<u32>,
    outgoing: bool,
    edge_type: ElementType,
    data: Data,
}

impl VersionedGraph {
    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Adds a brand-new node at its first version.
    pub fn add_node(&mut self, data: Data, timestamp: Timestamp) -> Node {
        let node = Node::new(Locator::generate(), data, timestamp);
        self.insert_vertex(node.clone());
        node
    }

    /// Replaces the active version of node `id` with a new version holding
    /// `data`.
    ///
    /// Every active edge touching the old version is expired and re-created
    /// against the new version with the same direction, type and data.
    pub fn update_node(
        &mut self,
        id: &NanoId,
        data: Data,
        timestamp: Timestamp,
    ) -> Result<Node, CoreError> {
        let (index, current) = self.active_vertex(id)?;
        let rewires = self.capture_rewires(index);

        self.expire_node(id, timestamp)?;

        let next = Node {
            node_type: current.node_type.clone(),
            ..Node::new(current.locator.increment(), data, timestamp)
        };
        let next_index = self.insert_vertex(next.clone());

        for rewire in rewires {
            let (source, target) = if rewire.outgoing {
                (next_index, rewire.other)
            } else {
                (rewire.other, next_index)
            };
            self.connect(
                source,
                target,
                Locator::generate(),
                rewire.edge_type,
                rewire.data,
                timestamp,
            )?;
        }

        debug!(node = %next.locator, "updated node");
        Ok(next)
    }

    /// Expires the active version of node `id` and every active edge that
    /// touches it.
    ///
    /// Already-expired incident edges keep their expiry. All incident edges
    /// are re-pointed at the expired node copy.
    pub fn expire_node(&mut self, id: &NanoId, timestamp: Timestamp) -> Result<Node, CoreError> {
        let (index, node) = self.active_vertex(id)?;
        let incident = self.incident_edges(index);

        for &edge in &incident {
            if self.is_active_edge(edge) {
                self.expire_edge_at(edge, timestamp)?;
            }
        }

        let expired = node.expire_at(timestamp);
        if let Some(weight) = self.graph.node_weight_mut(index) {
            *weight = Reference::Loaded(expired.clone());
        }
        self.events
            .push(GraphEvent::VertexRemoved(Reference::Loaded(expired.clone())));

        for edge in incident {
            if let Some(Reference::Loaded(stored)) = self.graph.edge_weight_mut(edge) {
                if stored.source.locator() == &expired.locator {
                    stored.source = Reference::Loaded(expired.clone());
                }
                if stored.target.locator() == &expired.locator {
                    stored.target = Reference::Loaded(expired.clone());
                }
            }
        }

        debug!(node = %expired.locator, "expired node");
        Ok(expired)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The node version at `locator`.
    pub fn find_node(&self, locator: &Locator) -> Result<Node, CoreError> {
        self.node_at(locator)
            .map(|n| self.with_membership_node(n))
            .ok_or_else(|| CoreError::not_found(Kind::Node, locator))
    }

    pub fn find_active_node(&self, id: &NanoId) -> Option<Node> {
        version::find_active(id, self.loaded_nodes())
            .cloned()
            .map(|n| self.with_membership_node(n))
    }

    pub fn find_node_at(&self, id: &NanoId, timestamp: Timestamp) -> Option<Node> {
        version::find_at(id, timestamp, self.loaded_nodes())
            .cloned()
            .map(|n| self.with_membership_node(n))
    }

    /// Every materialized version of node `id`, oldest first.
    pub fn find_node_versions(&self, id: &NanoId) -> Vec<Node> {
        version::find_versions(id, self.loaded_nodes())
            .into_iter()
            .cloned()
            .map(|n| self.with_membership_node(n))
            .collect()
    }

    /// Every active node version.
    pub fn active_nodes(&self) -> Vec<Node> {
        version::all_active(self.loaded_nodes())
            .into_iter()
            .cloned()
            .collect()
    }

    /// `true` if this node version is a vertex of the graph.
    pub fn contains_node(&self, locator: &Locator) -> bool {
        self.vertices.contains_key(locator)
    }

    /// Nodes joined to `node` by an active edge in either direction.
    pub fn neighbors(&self, node: &Node) -> Result<Vec<Node>, CoreError> {
        let index = self.vertex_of(&node.locator)?;
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();

        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(index, direction) {
                if !edge.weight().as_loaded().map_or(false, |e| e.is_active()) {
                    continue;
                }
                let other = if direction == Direction::Outgoing {
                    edge.target()
                } else {
                    edge.source()
                };
                if let Some(n) = self.graph[other].as_loaded() {
                    if seen.insert(n.locator.clone()) {
                        neighbors.push(n.clone());
                    }
                }
            }
        }

        Ok(neighbors)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(super) fn insert_vertex(&mut self, node: Node) -> NodeIndex<u32> {
        let locator = node.locator.clone();
        let index = self.graph.add_node(Reference::Loaded(node.clone()));
        self.vertices.insert(locator, index);
        debug!(node = %node.locator, "added vertex");
        self.events.push(GraphEvent::VertexAdded(Reference::Loaded(node)));
        index
    }

    fn capture_rewires(&self, index: NodeIndex<u32>) -> Vec<Rewire> {
        let mut rewires = Vec::new();
        for direction in [Direction::Incoming, Direction::Outgoing] {
            for edge in self.graph.edges_directed(index, direction) {
                let Some(stored) = edge.weight().as_loaded() else {
                    continue;
                };
                if !stored.is_active() {
                    continue;
                }
                let outgoing = direction == Direction::Outgoing;
                let other = if outgoing { edge.target() } else { edge.source() };
                if !self.graph[other].is_loaded() {
                    continue;
                }
                rewires.push(Rewire {
                    other,
                    outgoing,
                    edge_type: stored.edge_type.clone(),
                    data: stored.data.clone(),
                });
            }
        }
        rewires
    }
}

//! Structural change events and the sink contract that consumes them.
//!
//! Every mutating call on [`VersionedGraph`](crate::graph::VersionedGraph)
//! appends events to an ordered log instead of calling listeners inline. A
//! consumer drains the log and replays it into a [`GraphChangeSink`].
//!
//! An expiry is reported as a single `*Removed` event carrying the expired
//! copy, whose `expired` field holds the new timestamp.

use crate::edge::Edge;
use crate::node::Node;
use crate::reference::Reference;

/// One structural mutation of the live graph, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    VertexAdded(Reference<Node>),
    VertexRemoved(Reference<Node>),
    EdgeAdded(Reference<Edge>),
    EdgeRemoved(Reference<Edge>),
}

impl GraphEvent {
    /// Delivers this event to `sink`.
    ///
    /// Returns `false` without calling the sink when the carried reference is
    /// unloaded; there is nothing to persist for a locator alone.
    pub fn dispatch<S: GraphChangeSink + ?Sized>(&self, sink: &mut S) -> bool {
        match self {
            GraphEvent::VertexAdded(Reference::Loaded(node)) => sink.vertex_added(node),
            GraphEvent::VertexRemoved(Reference::Loaded(node)) => sink.vertex_removed(node),
            GraphEvent::EdgeAdded(Reference::Loaded(edge)) => sink.edge_added(edge),
            GraphEvent::EdgeRemoved(Reference::Loaded(edge)) => sink.edge_removed(edge),
            _ => return false,
        }
        true
    }
}

/// Receiver of structural graph changes.
pub trait GraphChangeSink {
    fn vertex_added(&mut self, node: &Node);
    fn vertex_removed(&mut self, node: &Node);
    fn edge_added(&mut self, edge: &Edge);
    fn edge_removed(&mut self, edge: &Edge);
}

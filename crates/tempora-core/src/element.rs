//! [`Element`]: the closed union of things a component or path can hold.

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::id::Locator;
use crate::node::Node;
use crate::reference::Kind;
use crate::version::{Locatable, Timestamp, Versioned};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Node(Node),
    Edge(Edge),
}

impl Element {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(edge) => Some(edge),
            Element::Node(_) => None,
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

impl From<Edge> for Element {
    fn from(edge: Edge) -> Self {
        Element::Edge(edge)
    }
}

impl Locatable for Element {
    fn locator(&self) -> &Locator {
        match self {
            Element::Node(node) => &node.locator,
            Element::Edge(edge) => &edge.locator,
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Element::Node(_) => Kind::Node,
            Element::Edge(_) => Kind::Edge,
        }
    }
}

impl Versioned for Element {
    fn created(&self) -> Timestamp {
        match self {
            Element::Node(node) => node.created,
            Element::Edge(edge) => edge.created,
        }
    }

    fn expired(&self) -> Option<Timestamp> {
        match self {
            Element::Node(node) => node.expired,
            Element::Edge(edge) => edge.expired,
        }
    }
}

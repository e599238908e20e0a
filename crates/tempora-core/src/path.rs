//! Paths through the graph as alternating node/edge sequences.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::element::Element;
use crate::error::CoreError;
use crate::node::Node;
use crate::reference::{Kind, Reference};

/// `Node, Edge, Node, ...`. An empty path means "no connection".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    elements: Vec<Reference<Element>>,
}

impl Path {
    pub fn empty() -> Self {
        Path::default()
    }

    /// Builds a path from an alternating element sequence.
    ///
    /// A non-empty path must have an odd length, alternate node and edge
    /// kinds, and start and end on loaded nodes.
    pub fn new(elements: Vec<Reference<Element>>) -> Result<Self, CoreError> {
        if elements.is_empty() {
            return Ok(Path::empty());
        }
        if elements.len() % 2 == 0 {
            return Err(CoreError::InvariantViolation {
                reason: format!(
                    "path of {} elements cannot alternate node and edge",
                    elements.len()
                ),
            });
        }
        for (i, element) in elements.iter().enumerate() {
            let expected = if i % 2 == 0 { Kind::Node } else { Kind::Edge };
            if element.kind() != expected {
                return Err(CoreError::InvariantViolation {
                    reason: format!(
                        "path position {} holds a {}, expected a {}",
                        i,
                        element.kind(),
                        expected
                    ),
                });
            }
        }
        let endpoints_loaded = [elements.first(), elements.last()]
            .into_iter()
            .flatten()
            .all(|e| matches!(e, Reference::Loaded(Element::Node(_))));
        if !endpoints_loaded {
            return Err(CoreError::InvariantViolation {
                reason: "path endpoints must be loaded nodes".into(),
            });
        }
        Ok(Path { elements })
    }

    /// Builds a path from a vertex list and the edges between them.
    pub fn from_parts(
        nodes: Vec<Reference<Node>>,
        edges: Vec<Reference<Edge>>,
    ) -> Result<Self, CoreError> {
        if nodes.is_empty() && edges.is_empty() {
            return Ok(Path::empty());
        }
        if nodes.len() != edges.len() + 1 {
            return Err(CoreError::InvariantViolation {
                reason: format!(
                    "path has {} vertices for {} edges",
                    nodes.len(),
                    edges.len()
                ),
            });
        }
        let mut elements = Vec::with_capacity(nodes.len() + edges.len());
        let mut edges = edges.into_iter();
        for node in nodes {
            elements.push(node.into_element());
            if let Some(edge) = edges.next() {
                elements.push(edge.into_element());
            }
        }
        Path::new(elements)
    }

    pub fn elements(&self) -> &[Reference<Element>] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Loaded nodes along the path, in order.
    pub fn nodes(&self) -> Vec<&Node> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Reference::Loaded(Element::Node(node)) => Some(node),
                _ => None,
            })
            .collect()
    }

    /// Loaded edges along the path, in order.
    pub fn edges(&self) -> Vec<&Edge> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Reference::Loaded(Element::Edge(edge)) => Some(edge),
                _ => None,
            })
            .collect()
    }

    /// Number of edges traversed. A single-node path has zero hops.
    pub fn hops(&self) -> usize {
        self.elements.len() / 2
    }

    pub fn source(&self) -> Option<&Node> {
        self.nodes().first().copied()
    }

    pub fn target(&self) -> Option<&Node> {
        self.nodes().last().copied()
    }

    /// `true` if any node version appears twice.
    pub fn contains_cycle(&self) -> bool {
        let mut seen = HashSet::new();
        self.elements
            .iter()
            .filter(|e| e.kind() == Kind::Node)
            .any(|e| !seen.insert(e.locator().clone()))
    }
}

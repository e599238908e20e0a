//! Component legality checks.
//!
//! A candidate element set is a legal component when, in order:
//!
//! 1. it is non-empty and holds at least one node,
//! 2. the sub-graph induced by exactly these nodes and edges is weakly
//!    connected,
//! 3. that sub-graph has no directed cycle,
//! 4. every edge's own stored endpoints are among the candidate nodes.
//!
//! Validation is a pure predicate over the candidate set and the current
//! graph.

use std::collections::HashMap;

use petgraph::algo::{connected_components, is_cyclic_directed};
use petgraph::graph::DiGraph;
use tracing::debug;

use super::VersionedGraph;
use crate::edge::Edge;
use crate::element::Element;
use crate::error::ValidationError;
use crate::id::Locator;
use crate::node::Node;

impl VersionedGraph {
    /// Checks that `elements` would form a legal component in this graph.
    pub fn validate_component(&self, elements: &[Element]) -> Result<(), ValidationError> {
        let result = self.check_component(elements);
        if let Err(rule) = &result {
            debug!(%rule, elements = elements.len(), "rejected component");
        }
        result
    }

    fn check_component(&self, elements: &[Element]) -> Result<(), ValidationError> {
        if elements.is_empty() {
            return Err(ValidationError::Empty);
        }

        let nodes: Vec<&Node> = elements.iter().filter_map(Element::as_node).collect();
        let edges: Vec<&Edge> = elements.iter().filter_map(Element::as_edge).collect();
        if nodes.is_empty() {
            return Err(ValidationError::NoNode);
        }

        if !(nodes.len() == 1 && edges.is_empty()) {
            let induced = self.induced_subgraph(&nodes, &edges);
            if connected_components(&induced) != 1 {
                return Err(ValidationError::Disconnected);
            }
            if is_cyclic_directed(&induced) {
                return Err(ValidationError::Cyclic);
            }
        }

        for edge in &edges {
            let closed = [&edge.source, &edge.target]
                .into_iter()
                .all(|end| nodes.iter().any(|n| &n.locator == end.locator()));
            if !closed {
                return Err(ValidationError::EdgeOutsideComponent {
                    edge: edge.locator.clone(),
                });
            }
        }

        Ok(())
    }

    /// The sub-graph of the live graph restricted to exactly `nodes` and
    /// `edges`. An edge is kept only when both of its graph endpoints are
    /// among `nodes`.
    fn induced_subgraph(&self, nodes: &[&Node], edges: &[&Edge]) -> DiGraph<(), ()> {
        let mut induced = DiGraph::new();
        let mut mapped: HashMap<&Locator, _> = HashMap::new();
        for node in nodes {
            mapped
                .entry(&node.locator)
                .or_insert_with(|| induced.add_node(()));
        }

        let mut seen = Vec::new();
        for edge in edges {
            if seen.contains(&&edge.locator) {
                continue;
            }
            seen.push(&edge.locator);

            let Some(&index) = self.edges.get(&edge.locator) else {
                continue;
            };
            let Some((from, to)) = self.graph.edge_endpoints(index) else {
                continue;
            };
            let from = mapped.get(self.graph[from].locator());
            let to = mapped.get(self.graph[to].locator());
            if let (Some(&from), Some(&to)) = (from, to) {
                induced.add_edge(from, to, ());
            }
        }
        induced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use chrono::Utc;

    struct Fixture {
        graph: VersionedGraph,
        a: Node,
        b: Node,
        c: Node,
    }

    fn fixture() -> Fixture {
        let mut graph = VersionedGraph::new();
        let t = Utc::now();
        let a = graph.add_node(Data::empty(), t);
        let b = graph.add_node(Data::empty(), t);
        let c = graph.add_node(Data::empty(), t);
        Fixture { graph, a, b, c }
    }

    fn edge(f: &mut Fixture, from: &Node, to: &Node) -> Element {
        Element::Edge(f.graph.add_edge(from, to, Data::empty(), Utc::now()).unwrap())
    }

    #[test]
    fn empty_set_is_rejected() {
        let f = fixture();
        assert_eq!(f.graph.validate_component(&[]), Err(ValidationError::Empty));
    }

    #[test]
    fn edges_only_is_rejected() {
        let mut f = fixture();
        let (a, b) = (f.a.clone(), f.b.clone());
        let ab = edge(&mut f, &a, &b);
        assert_eq!(f.graph.validate_component(&[ab]), Err(ValidationError::NoNode));
    }

    #[test]
    fn single_node_is_legal() {
        let f = fixture();
        assert_eq!(f.graph.validate_component(&[Element::Node(f.a.clone())]), Ok(()));
    }

    #[test]
    fn tree_is_legal() {
        let mut f = fixture();
        let (a, b, c) = (f.a.clone(), f.b.clone(), f.c.clone());
        let ab = edge(&mut f, &a, &b);
        let ac = edge(&mut f, &a, &c);
        let elements = vec![Element::Node(a), Element::Node(b), Element::Node(c), ab, ac];
        assert_eq!(f.graph.validate_component(&elements), Ok(()));
    }

    #[test]
    fn unconnected_nodes_are_rejected() {
        let f = fixture();
        let elements = vec![Element::Node(f.a.clone()), Element::Node(f.b.clone())];
        assert_eq!(
            f.graph.validate_component(&elements),
            Err(ValidationError::Disconnected)
        );
    }

    #[test]
    fn two_cycle_is_rejected() {
        let mut f = fixture();
        let (a, b) = (f.a.clone(), f.b.clone());
        let ab = edge(&mut f, &a, &b);
        let ba = edge(&mut f, &b, &a);
        let elements = vec![Element::Node(a), Element::Node(b), ab, ba];
        assert_eq!(f.graph.validate_component(&elements), Err(ValidationError::Cyclic));
    }

    #[test]
    fn edge_leaving_the_set_is_rejected() {
        let mut f = fixture();
        let (a, b, c) = (f.a.clone(), f.b.clone(), f.c.clone());
        let ab = edge(&mut f, &a, &b);
        let bc = edge(&mut f, &b, &c);
        let bc_locator = bc.as_edge().map(|e| e.locator.clone()).unwrap();
        let elements = vec![Element::Node(a), Element::Node(b), ab, bc];
        assert_eq!(
            f.graph.validate_component(&elements),
            Err(ValidationError::EdgeOutsideComponent { edge: bc_locator })
        );
    }

    #[test]
    fn validation_is_repeatable() {
        let mut f = fixture();
        let (a, b) = (f.a.clone(), f.b.clone());
        let ab = edge(&mut f, &a, &b);
        let elements = vec![Element::Node(a), Element::Node(b), ab];
        let first = f.graph.validate_component(&elements);
        let second = f.graph.validate_component(&elements);
        assert_eq!(first, second);
        assert!(first.is_ok());
    }
}

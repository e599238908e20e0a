//! Reachability and path search over the active graph.
//!
//! Only active, loaded edges between loaded vertices are traversed. Edges
//! only stay active while both of their endpoints are active, so every path
//! found here runs through active versions.
//!
//! `has_path` ignores edge direction while `shortest_path` and `all_paths`
//! follow it. A pair can therefore be connected with no directed path
//! between them.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::EdgeReference;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::VersionedGraph;
use crate::edge::Edge;
use crate::error::CoreError;
use crate::node::Node;
use crate::path::Path;
use crate::reference::Reference;
use crate::version::Versioned;

impl VersionedGraph {
    /// `true` if `source` and `target` are in the same weakly connected
    /// component of the active graph.
    ///
    /// Edge direction is ignored here, unlike [`shortest_path`](Self::shortest_path)
    /// and [`all_paths`](Self::all_paths).
    pub fn has_path(&self, source: &Node, target: &Node) -> Result<bool, CoreError> {
        let from = self.vertex_of(&source.locator)?;
        let to = self.vertex_of(&target.locator)?;

        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(at) = queue.pop_front() {
            if at == to {
                return Ok(true);
            }
            for direction in [Direction::Outgoing, Direction::Incoming] {
                for edge in self.graph.edges_directed(at, direction) {
                    if !self.traversable(&edge) {
                        continue;
                    }
                    let next = if direction == Direction::Outgoing {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Fewest-hop directed path from `source` to `target`, or an empty path
    /// when there is none. A node's path to itself is that single node.
    pub fn shortest_path(&self, source: &Node, target: &Node) -> Result<Path, CoreError> {
        let from = self.vertex_of(&source.locator)?;
        let to = self.vertex_of(&target.locator)?;
        if from == to {
            return self.to_path(&[from], &[]);
        }

        let mut parent: HashMap<NodeIndex<u32>, (NodeIndex<u32>, EdgeIndex<u32>)> = HashMap::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(at) = queue.pop_front() {
            for edge in self.graph.edges_directed(at, Direction::Outgoing) {
                if !self.traversable(&edge) {
                    continue;
                }
                let next = edge.target();
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, (at, edge.id()));
                if next == to {
                    return self.trace_back(&parent, from, to);
                }
                queue.push_back(next);
            }
        }
        Ok(Path::empty())
    }

    /// Every directed simple path from `source` to `target`, up to as many
    /// hops as there are vertices.
    pub fn all_paths(&self, source: &Node, target: &Node) -> Result<Vec<Path>, CoreError> {
        let from = self.vertex_of(&source.locator)?;
        let to = self.vertex_of(&target.locator)?;
        let max_hops = self.graph.node_count();

        let mut found = Vec::new();
        let mut vertices = vec![from];
        let mut edges = Vec::new();
        self.walk(to, max_hops, &mut vertices, &mut edges, &mut found)?;

        Ok(found.into_iter().filter(|p| !p.contains_cycle()).collect())
    }

    /// All simple paths between every pair of connected active nodes, taken
    /// in active-node order. Quadratic in the number of active nodes.
    pub fn active_connected(&self) -> Result<Vec<Path>, CoreError> {
        let active = self.active_nodes();
        let mut paths = Vec::new();
        for (i, source) in active.iter().enumerate() {
            for target in &active[i + 1..] {
                if self.has_path(source, target)? {
                    paths.extend(self.all_paths(source, target)?);
                }
            }
        }
        Ok(paths)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn traversable(&self, edge: &EdgeReference<'_, Reference<Edge>, u32>) -> bool {
        edge.weight().as_loaded().map_or(false, |e| e.is_active())
            && self.graph[edge.source()].is_loaded()
            && self.graph[edge.target()].is_loaded()
    }

    fn walk(
        &self,
        target: NodeIndex<u32>,
        max_hops: usize,
        vertices: &mut Vec<NodeIndex<u32>>,
        edges: &mut Vec<EdgeIndex<u32>>,
        found: &mut Vec<Path>,
    ) -> Result<(), CoreError> {
        let Some(&at) = vertices.last() else {
            return Ok(());
        };
        if at == target {
            found.push(self.to_path(vertices, edges)?);
            return Ok(());
        }
        if edges.len() >= max_hops {
            return Ok(());
        }
        for edge in self.graph.edges_directed(at, Direction::Outgoing) {
            if !self.traversable(&edge) || vertices.contains(&edge.target()) {
                continue;
            }
            vertices.push(edge.target());
            edges.push(edge.id());
            self.walk(target, max_hops, vertices, edges, found)?;
            vertices.pop();
            edges.pop();
        }
        Ok(())
    }

    fn trace_back(
        &self,
        parent: &HashMap<NodeIndex<u32>, (NodeIndex<u32>, EdgeIndex<u32>)>,
        from: NodeIndex<u32>,
        to: NodeIndex<u32>,
    ) -> Result<Path, CoreError> {
        let mut vertices = vec![to];
        let mut edges = Vec::new();
        let mut at = to;
        while at != from {
            let Some(&(prev, edge)) = parent.get(&at) else {
                return Err(CoreError::InvariantViolation {
                    reason: "broken predecessor chain in shortest path".into(),
                });
            };
            vertices.push(prev);
            edges.push(edge);
            at = prev;
        }
        vertices.reverse();
        edges.reverse();
        self.to_path(&vertices, &edges)
    }

    fn to_path(
        &self,
        vertices: &[NodeIndex<u32>],
        edges: &[EdgeIndex<u32>],
    ) -> Result<Path, CoreError> {
        Path::from_parts(
            vertices.iter().map(|&v| self.graph[v].clone()).collect(),
            edges.iter().map(|&e| self.graph[e].clone()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use chrono::Utc;

    fn graph_with(n: usize) -> (VersionedGraph, Vec<Node>) {
        let mut graph = VersionedGraph::new();
        let t = Utc::now();
        let nodes = (0..n).map(|_| graph.add_node(Data::empty(), t)).collect();
        (graph, nodes)
    }

    fn link(graph: &mut VersionedGraph, a: &Node, b: &Node) -> Edge {
        graph.add_edge(a, b, Data::empty(), Utc::now()).unwrap()
    }

    #[test]
    fn shortest_path_to_self_is_single_node() {
        let (graph, nodes) = graph_with(1);
        let path = graph.shortest_path(&nodes[0], &nodes[0]).unwrap();
        assert_eq!(path.hops(), 0);
        assert_eq!(path.nodes().len(), 1);
    }

    #[test]
    fn shortest_path_prefers_fewest_hops() {
        let (mut graph, n) = graph_with(4);
        link(&mut graph, &n[0], &n[1]);
        link(&mut graph, &n[1], &n[2]);
        link(&mut graph, &n[2], &n[3]);
        let direct = link(&mut graph, &n[0], &n[3]);

        let path = graph.shortest_path(&n[0], &n[3]).unwrap();
        assert_eq!(path.hops(), 1);
        assert_eq!(path.edges()[0].locator, direct.locator);
    }

    #[test]
    fn shortest_path_follows_direction() {
        let (mut graph, n) = graph_with(2);
        link(&mut graph, &n[0], &n[1]);
        assert!(graph.shortest_path(&n[1], &n[0]).unwrap().is_empty());
        // weak connectivity still sees the pair
        assert!(graph.has_path(&n[1], &n[0]).unwrap());
    }

    #[test]
    fn disconnected_pair() {
        let (graph, n) = graph_with(2);
        assert!(!graph.has_path(&n[0], &n[1]).unwrap());
        assert!(graph.shortest_path(&n[0], &n[1]).unwrap().is_empty());
        assert!(graph.all_paths(&n[0], &n[1]).unwrap().is_empty());
    }

    #[test]
    fn expired_edges_are_not_traversed() {
        let (mut graph, n) = graph_with(2);
        let edge = link(&mut graph, &n[0], &n[1]);
        graph.expire_edge(&edge.locator.id, Utc::now()).unwrap();
        assert!(!graph.has_path(&n[0], &n[1]).unwrap());
        assert!(graph.shortest_path(&n[0], &n[1]).unwrap().is_empty());
    }

    #[test]
    fn all_paths_counts_parallel_edges() {
        let (mut graph, n) = graph_with(2);
        link(&mut graph, &n[0], &n[1]);
        link(&mut graph, &n[0], &n[1]);
        assert_eq!(graph.all_paths(&n[0], &n[1]).unwrap().len(), 2);
    }

    #[test]
    fn all_paths_skip_cycles() {
        let (mut graph, n) = graph_with(3);
        link(&mut graph, &n[0], &n[1]);
        link(&mut graph, &n[1], &n[0]);
        link(&mut graph, &n[1], &n[2]);
        let paths = graph.all_paths(&n[0], &n[2]).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.iter().all(|p| !p.contains_cycle()));
    }

    #[test]
    fn active_connected_walks_every_pair() {
        let (mut graph, n) = graph_with(3);
        link(&mut graph, &n[0], &n[1]);
        link(&mut graph, &n[1], &n[2]);
        // pairs (0,1), (0,2), (1,2) each have exactly one directed path
        assert_eq!(graph.active_connected().unwrap().len(), 3);
    }

    #[test]
    fn unknown_node_is_not_found() {
        let (graph, n) = graph_with(1);
        let stranger = Node::new(crate::id::Locator::generate(), Data::empty(), Utc::now());
        assert!(graph.has_path(&n[0], &stranger).is_err());
    }
}

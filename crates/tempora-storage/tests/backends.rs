//! Both backends driven through the same scenarios.
//!
//! Each scenario is written once against [`GraphStore`] and run on the
//! in-memory and the SQLite store, which must agree exactly.

use chrono::{DateTime, TimeZone, Utc};

use tempora_core::{Data, Element, Locator, NanoId, Node, VersionedGraph};
use tempora_storage::{
    DelegatedChangeSink, GraphStore, InMemoryGraphStore, SqliteGraphStore, StorageError,
    VersionedStore,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn label(s: &str) -> Data {
    Data::new("label", serde_json::json!(s))
}

fn node(id: &str, version: u32, created: i64, expired: Option<i64>) -> Node {
    let mut node = Node::new(Locator::new(NanoId::new(id), version), label(id), at(created));
    node.expired = expired.map(at);
    node
}

fn sqlite() -> SqliteGraphStore {
    SqliteGraphStore::in_memory().unwrap()
}

/// Replays the graph's pending events into `store`.
fn persist<S: GraphStore>(graph: &mut VersionedGraph, store: &mut S) -> usize {
    let mut sink = DelegatedChangeSink::new();
    sink.publish(graph.drain_events());
    sink.flush(store).unwrap()
}

/// Rebuilds a live graph from everything in `store`.
fn hydrate<S: GraphStore>(store: &S) -> VersionedGraph {
    VersionedGraph::from_parts(
        store.nodes().load_all().unwrap(),
        store.edges().load_all().unwrap(),
        store.components().load_all().unwrap(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn version_selection<S: GraphStore>(mut store: S) {
    store.nodes_mut().save(&node("a", 1, 0, Some(10))).unwrap();
    store.nodes_mut().save(&node("a", 2, 10, Some(20))).unwrap();
    store.nodes_mut().save(&node("a", 3, 20, None)).unwrap();
    store.nodes_mut().save(&node("b", 1, 5, Some(6))).unwrap();
    let a = NanoId::new("a");

    let version_at = |s| store.nodes().find_at(&a, at(s)).unwrap().map(|n| n.locator.version);
    assert_eq!(version_at(-1), None);
    assert_eq!(version_at(9), Some(1));
    assert_eq!(version_at(10), Some(2));
    assert_eq!(version_at(25), Some(3));

    assert_eq!(
        store.nodes().find_active(&a).unwrap().map(|n| n.locator.version),
        Some(3)
    );
    assert_eq!(store.nodes().find_active(&NanoId::new("b")).unwrap(), None);
    assert_eq!(store.nodes().all_ids().unwrap(), vec![a.clone(), NanoId::new("b")]);
    assert_eq!(store.nodes().all_active_ids().unwrap(), vec![a]);
    assert_eq!(store.nodes().load_all().unwrap().len(), 4);
}

fn graph_round_trip<S: GraphStore>(mut store: S) {
    let mut graph = VersionedGraph::new();
    let a = graph.add_node(label("A"), at(0));
    let b = graph.add_node(label("B"), at(0));
    let ab = graph.add_edge(&a, &b, label("A->B"), at(0)).unwrap();
    assert_eq!(persist(&mut graph, &mut store), 3);

    let a2 = graph.update_node(&a.locator.id, label("A2"), at(10)).unwrap();
    // edge expiry, node expiry, new node, re-created edge
    assert_eq!(persist(&mut graph, &mut store), 4);

    let old_edge = store.edges().find(&ab.locator).unwrap().unwrap();
    assert_eq!(old_edge.expired, Some(at(10)));
    assert_eq!(
        store.nodes().find_active(&a.locator.id).unwrap().map(|n| n.locator),
        Some(a2.locator.clone())
    );

    let restored = hydrate(&store);
    assert!(restored.pending_events().is_empty());
    assert_eq!(restored.vertex_count(), graph.vertex_count());
    assert_eq!(restored.edge_count(), graph.edge_count());

    let from_a2 = restored.edges_from(&a2).unwrap();
    assert_eq!(from_a2.len(), 1);
    assert!(from_a2[0].target.is_loaded());
    assert_eq!(from_a2[0].target.locator(), &b.locator);
    assert_eq!(
        restored.find_node_at(&a.locator.id, at(5)).map(|n| n.locator),
        Some(a.locator)
    );
    assert_eq!(restored.shortest_path(&a2, &b).unwrap().len(), 1);
}

fn components_survive_hydration<S: GraphStore>(mut store: S) {
    let mut graph = VersionedGraph::new();
    let a = graph.add_node(label("A"), at(0));
    let b = graph.add_node(label("B"), at(0));
    let ab = graph.add_edge(&a, &b, label("A->B"), at(0)).unwrap();
    persist(&mut graph, &mut store);

    let component = graph
        .add_component(
            vec![Element::Node(a.clone()), Element::Node(b), Element::Edge(ab)],
            label("C"),
            at(1),
        )
        .unwrap();
    store.components_mut().save(&component).unwrap();

    let restored = hydrate(&store);
    let stored = restored.find_active_component(&component.locator.id).unwrap();
    assert_eq!(stored.elements.len(), 3);
    assert!(stored.elements.iter().all(|e| e.is_loaded()));
    assert_eq!(restored.components_containing(&a.locator).len(), 1);
    assert_eq!(restored.components_containing_id(&a.locator.id).len(), 1);
}

fn failed_flush_leaves_store_untouched<S: GraphStore>(mut store: S) {
    let mut graph = VersionedGraph::new();
    let a = graph.add_node(label("A"), at(0));
    // Dropping the add means the store never learns about `a`.
    graph.drain_events();
    graph.add_node(label("B"), at(1));
    graph.expire_node(&a.locator.id, at(2)).unwrap();

    let mut sink = DelegatedChangeSink::new();
    sink.publish(graph.drain_events());
    match sink.flush(&mut store) {
        Err(StorageError::IntegrityError { .. }) => {}
        other => panic!("expected IntegrityError, got {:?}", other),
    }
    assert!(sink.pending().is_empty());
    assert!(store.nodes().load_all().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Per-backend entry points
// ---------------------------------------------------------------------------

#[test]
fn memory_version_selection() {
    version_selection(InMemoryGraphStore::new());
}

#[test]
fn sqlite_version_selection() {
    version_selection(sqlite());
}

#[test]
fn memory_graph_round_trip() {
    graph_round_trip(InMemoryGraphStore::new());
}

#[test]
fn sqlite_graph_round_trip() {
    graph_round_trip(sqlite());
}

#[test]
fn memory_components_survive_hydration() {
    components_survive_hydration(InMemoryGraphStore::new());
}

#[test]
fn sqlite_components_survive_hydration() {
    components_survive_hydration(sqlite());
}

#[test]
fn memory_failed_flush_leaves_store_untouched() {
    failed_flush_leaves_store_untouched(InMemoryGraphStore::new());
}

#[test]
fn sqlite_failed_flush_leaves_store_untouched() {
    failed_flush_leaves_store_untouched(sqlite());
}

#[test]
fn sqlite_file_database_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let path = path.to_str().unwrap();

    {
        let mut store = SqliteGraphStore::new(path).unwrap();
        store.nodes_mut().save(&node("a", 1, 0, None)).unwrap();
    }
    let store = SqliteGraphStore::new(path).unwrap();
    assert_eq!(store.nodes().all_active_ids().unwrap(), vec![NanoId::new("a")]);
}

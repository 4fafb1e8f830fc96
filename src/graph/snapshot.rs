//! Immutable version-pinned graph view
//!
//! Readers (embedding engine, anomaly scorer, propagation simulator) only
//! ever see a snapshot, so concurrent mutation of the live store can never
//! be observed mid-computation. Snapshots are cheap to clone and safe to
//! ship to worker threads.

use super::edge::Edge;
use super::node::Node;
use super::types::{Direction, EdgeId, NodeId, NodeKind, Relation};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read-only view of the graph pinned to one version.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    /// Graph version this view was taken at
    pub version: u64,
    nodes: Arc<Vec<Node>>,
    edges: Arc<Vec<Edge>>,
    outgoing: Arc<Vec<Vec<EdgeId>>>,
    incoming: Arc<Vec<Vec<EdgeId>>>,
    key_index: Arc<FxHashMap<String, NodeId>>,
}

impl GraphSnapshot {
    pub(crate) fn new(
        version: u64,
        nodes: Arc<Vec<Node>>,
        edges: Arc<Vec<Edge>>,
        outgoing: Arc<Vec<Vec<EdgeId>>>,
        incoming: Arc<Vec<Vec<EdgeId>>>,
        key_index: Arc<FxHashMap<String, NodeId>>,
    ) -> Self {
        GraphSnapshot {
            version,
            nodes,
            edges,
            outgoing,
            incoming,
            key_index,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub fn node_by_key(&self, key: &str) -> Option<&Node> {
        self.key_index.get(key).and_then(|id| self.node(*id))
    }

    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.key_index.get(key).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes including retired history.
    pub fn all_nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges including retired history.
    pub fn all_edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn active_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_active())
    }

    pub fn active_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.is_active())
    }

    /// Active nodes of one kind in id order.
    pub fn active_nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.active_nodes().filter(move |n| n.kind == kind)
    }

    /// All outgoing edges of a node, including retired ones.
    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|eid| &self.edges[eid.index()])
    }

    /// All incoming edges of a node, including retired ones.
    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.incoming
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|eid| &self.edges[eid.index()])
    }

    /// Active adjacent node ids filtered by relation and direction.
    pub fn neighbors<'a>(
        &'a self,
        id: NodeId,
        relation: Option<Relation>,
        direction: Direction,
    ) -> impl Iterator<Item = NodeId> + 'a {
        let out = matches!(direction, Direction::Outgoing | Direction::Both);
        let inc = matches!(direction, Direction::Incoming | Direction::Both);
        let outgoing = out
            .then(|| self.outgoing_edges(id))
            .into_iter()
            .flatten()
            .filter(move |e| e.is_active() && relation.map_or(true, |r| e.relation == r))
            .map(|e| e.target);
        let incoming = inc
            .then(|| self.incoming_edges(id))
            .into_iter()
            .flatten()
            .filter(move |e| e.is_active() && relation.map_or(true, |r| e.relation == r))
            .map(|e| e.source);
        outgoing
            .chain(incoming)
            .filter(move |n| self.nodes[n.index()].is_active())
    }

    /// Summary statistics over the active graph.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for kind in NodeKind::ALL {
            let count = self.active_nodes_of_kind(kind).count();
            stats.nodes_by_kind.push((kind, count));
            stats.total_nodes += count;
        }
        for relation in Relation::ALL {
            let count = self
                .active_edges()
                .filter(|e| e.relation == relation)
                .count();
            stats.edges_by_relation.push((relation, count));
            stats.total_edges += count;
        }
        let n = stats.total_nodes;
        stats.density = if n > 1 {
            stats.total_edges as f64 / (n * (n - 1)) as f64
        } else {
            0.0
        };
        stats
    }
}

/// Node/edge counts per kind and relation over the active graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes_by_kind: Vec<(NodeKind, usize)>,
    pub edges_by_relation: Vec<(Relation, usize)>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub density: f64,
}

impl GraphStats {
    /// JSON rendering for export and dashboards.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "── Supplier Knowledge Graph ─────────────────────".to_string(),
            format!("  Total nodes : {:>5}", self.total_nodes),
            format!("  Total edges : {:>5}", self.total_edges),
            format!("  Density     : {:.6}", self.density),
            String::new(),
            "  Nodes by kind:".to_string(),
        ];
        for (kind, count) in &self.nodes_by_kind {
            lines.push(format!("    {:12}: {:>4}", kind.as_str(), count));
        }
        lines.push(String::new());
        lines.push("  Edges by relation:".to_string());
        for (relation, count) in &self.edges_by_relation {
            lines.push(format!("    {:16}: {:>4}", relation.as_str(), count));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attr::AttrMap;
    use crate::graph::store::GraphStore;

    fn small_graph() -> GraphStore {
        let mut store = GraphStore::new();
        let s1 = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let s2 = store
            .add_node(NodeKind::Supplier, "SUP_0002", AttrMap::new())
            .unwrap();
        let c = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        store.add_edge(s1, c, Relation::Supplies, 0.6, None).unwrap();
        store.add_edge(s2, c, Relation::Supplies, 0.4, None).unwrap();
        store.add_edge(s1, s2, Relation::CoSupplier, 0.5, None).unwrap();
        store
    }

    #[test]
    fn test_snapshot_lookup() {
        let store = small_graph();
        let snap = store.snapshot();
        assert_eq!(snap.node_by_key("SUP_0001").unwrap().kind, NodeKind::Supplier);
        assert!(snap.node_by_key("SUP_9999").is_none());
        assert_eq!(snap.active_nodes().count(), 3);
        assert_eq!(snap.active_edges().count(), 3);
    }

    #[test]
    fn test_snapshot_neighbors() {
        let store = small_graph();
        let snap = store.snapshot();
        let s1 = snap.node_id("SUP_0001").unwrap();
        let c = snap.node_id("COMP_0001").unwrap();

        let targets: Vec<_> = snap
            .neighbors(s1, Some(Relation::Supplies), Direction::Outgoing)
            .collect();
        assert_eq!(targets, vec![c]);

        let inbound: Vec<_> = snap
            .neighbors(c, Some(Relation::Supplies), Direction::Incoming)
            .collect();
        assert_eq!(inbound.len(), 2);
    }

    #[test]
    fn test_stats() {
        let store = small_graph();
        let stats = store.snapshot().stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_edges, 3);
        let suppliers = stats
            .nodes_by_kind
            .iter()
            .find(|(k, _)| *k == NodeKind::Supplier)
            .unwrap()
            .1;
        assert_eq!(suppliers, 2);
        assert!(stats.density > 0.0);
        assert!(stats.summary().contains("Total nodes"));
        assert!(stats.to_json().unwrap().contains("total_nodes"));
    }

    #[test]
    fn test_stats_exclude_retired() {
        let mut store = small_graph();
        let s2 = store.node_id("SUP_0002").unwrap();
        store.retire_node(s2).unwrap();
        let stats = store.snapshot().stats();
        assert_eq!(stats.total_nodes, 2);
        // co_supplier and s2's supplies edge went with it
        assert_eq!(stats.total_edges, 1);
    }
}

//! Dense, integer-indexed projection of the active graph
//!
//! The arena store is good for random access but slow for the tight loops
//! of message passing and impact propagation. This view remaps active node
//! ids to dense indices (0..N) and lays out messages per node, grouped by
//! relation channel.
//!
//! Channels: each relation contributes a forward channel (edge source ->
//! target) and a reverse channel (target -> source), so aggregators can be
//! parameterized independently per direction. With 11 relations that is 22
//! channels.

use super::edge::Edge;
use super::snapshot::GraphSnapshot;
use super::types::{EdgeId, NodeId, Relation};
use rustc_hash::{FxHashMap, FxHashSet};

/// Number of relation kinds.
pub const NUM_RELATIONS: usize = Relation::ALL.len();

/// Forward + reverse channel per relation.
pub const NUM_CHANNELS: usize = NUM_RELATIONS * 2;

/// Forward channel index for a relation.
pub fn forward_channel(relation: Relation) -> usize {
    relation.ordinal()
}

/// Reverse channel index for a relation.
pub fn reverse_channel(relation: Relation) -> usize {
    NUM_RELATIONS + relation.ordinal()
}

/// One inbound message slot: `source` (dense index) feeds this node over
/// `channel` with the given edge weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Message {
    pub channel: usize,
    pub source: usize,
    pub weight: f64,
}

/// Filter applied while building a view: hypothetical removals and weight
/// overrides (counterfactual overlays), plus an optional time cursor for
/// edge validity windows.
#[derive(Debug, Clone, Default)]
pub struct ViewFilter {
    pub removed_nodes: FxHashSet<NodeId>,
    pub removed_edges: FxHashSet<EdgeId>,
    pub weight_overrides: FxHashMap<EdgeId, f64>,
    pub as_of: Option<i64>,
}

impl ViewFilter {
    fn admits_edge(&self, edge: &Edge) -> bool {
        edge.is_active()
            && !self.removed_edges.contains(&edge.id)
            && !self.removed_nodes.contains(&edge.source)
            && !self.removed_nodes.contains(&edge.target)
            && self.as_of.map_or(true, |t| edge.active_at(t))
    }

    fn effective_weight(&self, edge: &Edge) -> f64 {
        self.weight_overrides
            .get(&edge.id)
            .copied()
            .unwrap_or(edge.weight)
    }
}

/// Dense projection of the active graph under a filter.
#[derive(Debug)]
pub struct DenseView {
    /// Number of projected nodes
    pub node_count: usize,
    /// Dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// NodeId to dense index
    pub node_to_index: FxHashMap<NodeId, usize>,
    /// Inbound message slots per node, forward channels first. Built in
    /// edge-id order, so layout is deterministic for a given snapshot.
    pub messages: Vec<Vec<Message>>,
}

impl DenseView {
    /// Project the active subgraph of a snapshot.
    pub fn build(snapshot: &GraphSnapshot, filter: &ViewFilter) -> Self {
        // 1. Collect active nodes in id order
        let mut index_to_node = Vec::new();
        for node in snapshot.active_nodes() {
            if !filter.removed_nodes.contains(&node.id) {
                index_to_node.push(node.id);
            }
        }
        let node_count = index_to_node.len();

        let mut node_to_index =
            FxHashMap::with_capacity_and_hasher(node_count, Default::default());
        for (idx, id) in index_to_node.iter().enumerate() {
            node_to_index.insert(*id, idx);
        }

        // 2. Lay out message slots, edge-id order
        let mut messages = vec![Vec::new(); node_count];
        for edge in snapshot.all_edges() {
            if !filter.admits_edge(edge) {
                continue;
            }
            let (Some(&u), Some(&v)) = (
                node_to_index.get(&edge.source),
                node_to_index.get(&edge.target),
            ) else {
                continue;
            };
            let weight = filter.effective_weight(edge);
            messages[v].push(Message {
                channel: forward_channel(edge.relation),
                source: u,
                weight,
            });
            messages[u].push(Message {
                channel: reverse_channel(edge.relation),
                source: v,
                weight,
            });
        }

        DenseView {
            node_count,
            index_to_node,
            node_to_index,
            messages,
        }
    }

    /// Inbound forward-channel messages of a node (edge source feeding the
    /// edge target), as used by impact propagation.
    pub fn inbound(&self, idx: usize) -> impl Iterator<Item = &Message> {
        self.messages[idx]
            .iter()
            .filter(|m| m.channel < NUM_RELATIONS)
    }

    pub fn in_degree(&self, idx: usize) -> usize {
        self.inbound(idx).count()
    }
}

//! Counterfactual graph overlays
//!
//! An overlay describes hypothetical edits in terms of node keys and
//! relations, the vocabulary callers actually hold. Resolution against a
//! snapshot turns it into the id-level `ViewFilter` the dense projection
//! consumes, failing loudly on keys or edges that do not exist rather than
//! silently simulating against a different graph than the caller imagined.

use super::SimError;
use crate::graph::{EdgeId, GraphSnapshot, Relation, ViewFilter};

/// Hypothetical edits layered over a snapshot for one simulation.
#[derive(Debug, Clone, Default)]
pub struct GraphOverlay {
    removed_nodes: Vec<String>,
    removed_edges: Vec<(String, String, Relation)>,
    weight_overrides: Vec<(String, String, Relation, f64)>,
}

impl GraphOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate with this node (and all its edges) absent.
    pub fn remove_node(mut self, key: impl Into<String>) -> Self {
        self.removed_nodes.push(key.into());
        self
    }

    /// Simulate with one edge absent.
    pub fn remove_edge(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: Relation,
    ) -> Self {
        self.removed_edges.push((source.into(), target.into(), relation));
        self
    }

    /// Simulate with one edge's weight replaced.
    pub fn override_weight(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: Relation,
        weight: f64,
    ) -> Self {
        self.weight_overrides
            .push((source.into(), target.into(), relation, weight));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
            && self.weight_overrides.is_empty()
    }

    /// Resolve keys against a snapshot into an id-level filter.
    pub fn resolve(&self, snapshot: &GraphSnapshot) -> Result<ViewFilter, SimError> {
        let mut filter = ViewFilter::default();

        for key in &self.removed_nodes {
            let node = snapshot
                .node_by_key(key)
                .ok_or_else(|| SimError::UnknownNode(key.clone()))?;
            if !node.is_active() {
                return Err(SimError::NodeRetired(key.clone()));
            }
            filter.removed_nodes.insert(node.id);
        }

        for (source, target, relation) in &self.removed_edges {
            let id = resolve_edge(snapshot, source, target, *relation)?;
            filter.removed_edges.insert(id);
        }

        for (source, target, relation, weight) in &self.weight_overrides {
            if !(0.0..=1.0).contains(weight) || !weight.is_finite() {
                return Err(SimError::InvalidWeight(*weight));
            }
            let id = resolve_edge(snapshot, source, target, *relation)?;
            filter.weight_overrides.insert(id, *weight);
        }

        Ok(filter)
    }
}

fn resolve_edge(
    snapshot: &GraphSnapshot,
    source: &str,
    target: &str,
    relation: Relation,
) -> Result<EdgeId, SimError> {
    let source_id = snapshot
        .node_id(source)
        .ok_or_else(|| SimError::UnknownNode(source.to_string()))?;
    let target_id = snapshot
        .node_id(target)
        .ok_or_else(|| SimError::UnknownNode(target.to_string()))?;

    snapshot
        .outgoing_edges(source_id)
        .find(|e| e.is_active() && e.target == target_id && e.relation == relation)
        .map(|e| e.id)
        .ok_or_else(|| SimError::UnknownEdge {
            src: source.to_string(),
            target: target.to_string(),
            relation,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrMap, GraphStore, NodeKind};

    fn graph() -> GraphStore {
        let mut store = GraphStore::new();
        let s = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let c = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        store.add_edge(s, c, Relation::Supplies, 0.8, None).unwrap();
        store
    }

    #[test]
    fn test_resolve_removals_and_overrides() {
        let store = graph();
        let snap = store.snapshot();

        let filter = GraphOverlay::new()
            .remove_node("SUP_0001")
            .override_weight("SUP_0001", "COMP_0001", Relation::Supplies, 0.2)
            .resolve(&snap)
            .unwrap();
        assert_eq!(filter.removed_nodes.len(), 1);
        assert_eq!(filter.weight_overrides.len(), 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let store = graph();
        let err = GraphOverlay::new()
            .remove_node("SUP_9999")
            .resolve(&store.snapshot())
            .unwrap_err();
        assert_eq!(err, SimError::UnknownNode("SUP_9999".to_string()));
    }

    #[test]
    fn test_missing_edge_rejected() {
        let store = graph();
        let err = GraphOverlay::new()
            .remove_edge("COMP_0001", "SUP_0001", Relation::Supplies)
            .resolve(&store.snapshot())
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownEdge { .. }));
    }

    #[test]
    fn test_bad_override_weight_rejected() {
        let store = graph();
        let err = GraphOverlay::new()
            .override_weight("SUP_0001", "COMP_0001", Relation::Supplies, 1.5)
            .resolve(&store.snapshot())
            .unwrap_err();
        assert_eq!(err, SimError::InvalidWeight(1.5));
    }
}

//! Edge implementation for the supplier knowledge graph

use super::types::{EdgeId, NodeId, Relation, Validity};
use serde::{Deserialize, Serialize};

/// A directed, weighted edge in the knowledge graph.
///
/// The weight is a relationship-strength / dependency fraction in [0, 1].
/// For capacity-constrained relations (SUPPLIES) the store enforces that
/// active outgoing weights from one node sum to <= 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    /// Relation kind
    pub relation: Relation,

    /// Relationship strength / dependency fraction in [0, 1]
    pub weight: f64,

    /// Optional temporal validity window
    pub validity: Option<Validity>,

    /// Graph version at which this edge was last written
    pub version: u64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Soft-delete marker
    pub retired_at: Option<i64>,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        relation: Relation,
        weight: f64,
        validity: Option<Validity>,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            relation,
            weight,
            validity,
            version: 1,
            created_at: chrono::Utc::now().timestamp_millis(),
            retired_at: None,
        }
    }

    /// Not retired. Validity windows additionally gate [`Edge::active_at`].
    pub fn is_active(&self) -> bool {
        self.retired_at.is_none()
    }

    /// Active and within the validity window at `ts`.
    pub fn active_at(&self, ts: i64) -> bool {
        self.is_active() && self.validity.map_or(true, |v| v.contains(ts))
    }

    pub fn retire(&mut self) {
        if self.retired_at.is_none() {
            self.retired_at = Some(chrono::Utc::now().timestamp_millis());
        }
    }

    /// Check if this edge connects two specific nodes (either direction)
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    pub fn starts_from(&self, node: NodeId) -> bool {
        self.source == node
    }

    pub fn ends_at(&self, node: NodeId) -> bool {
        self.target == node
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint.
    pub fn other_endpoint(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

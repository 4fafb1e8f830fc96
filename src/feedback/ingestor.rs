//! Outcome ingestion into the live graph
//!
//! Each outcome maps to a small batch of graph mutations. The batch is
//! planned and validated in full against the current state before any
//! mutation is applied, so a rejected outcome leaves the graph exactly as
//! it was. After applying, cached embeddings within a hop radius of the
//! touched nodes are invalidated; the caller schedules the incremental
//! recompute.

use crate::config::FeedbackConfig;
use crate::embed::EmbeddingCache;
use crate::graph::{
    AttrMap, AttrValue, Direction, EdgeId, GraphError, GraphSnapshot, GraphStore, NodeId,
    NodeKind, Relation,
};
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("'{key}' is not an active {expected} node")]
    WrongKind { key: String, expected: NodeKind },

    #[error("no active SUPPLIES edge from '{supplier}' to '{component}'")]
    MissingSupply { supplier: String, component: String },

    #[error("switch source and destination are both '{0}'")]
    SameSupplier(String),

    #[error("adjustment {0} is not finite")]
    BadAdjustment(f64),
}

/// A real-world outcome of a procurement decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// Volume moved from one supplier of a component to another. Retires
    /// the old supply edge and creates the replacement at `weight`.
    SupplierSwitch {
        component: String,
        from_supplier: String,
        to_supplier: String,
        weight: f64,
        /// Realized unit-cost change, folded into the component's cost
        cost_delta_usd: f64,
    },
    /// A contract was renegotiated to a new value.
    PriceRenegotiation {
        contract: String,
        new_value_usd: f64,
        savings_usd: f64,
    },
    /// A quality or delivery claim against a supplier was resolved;
    /// `reliability_delta` is signed and the score stays clamped to [0, 1].
    ClaimResolution {
        supplier: String,
        reliability_delta: f64,
    },
}

/// What an accepted outcome did to the graph.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// Graph version after the batch
    pub version: u64,
    /// Nodes the batch touched directly
    pub touched: Vec<NodeId>,
    /// Cached embeddings dropped around the touched nodes
    pub invalidated: usize,
}

// Planned mutations, validated up front and applied in order.
enum Mutation {
    RetireEdge(EdgeId),
    AddEdge {
        source: NodeId,
        target: NodeId,
        relation: Relation,
        weight: f64,
    },
    PatchAttrs {
        node: NodeId,
        patch: AttrMap,
    },
}

#[derive(Debug, Clone)]
pub struct FeedbackIngestor {
    cfg: FeedbackConfig,
}

impl FeedbackIngestor {
    pub fn new(cfg: FeedbackConfig) -> Self {
        FeedbackIngestor { cfg }
    }

    /// Fold one outcome into the graph and invalidate stale cache entries
    /// around the touched nodes.
    pub fn ingest(
        &self,
        store: &mut GraphStore,
        cache: &mut EmbeddingCache,
        outcome: &DecisionOutcome,
    ) -> Result<IngestReceipt, FeedbackError> {
        let (mutations, touched) = self.plan(store, outcome)?;
        for mutation in mutations {
            match mutation {
                Mutation::RetireEdge(id) => store.retire_edge(id)?,
                Mutation::AddEdge {
                    source,
                    target,
                    relation,
                    weight,
                } => {
                    store.add_edge(source, target, relation, weight, None)?;
                }
                Mutation::PatchAttrs { node, patch } => store.update_attrs(node, patch)?,
            }
        }

        let snapshot = store.snapshot();
        let region = invalidation_region(&snapshot, &touched, self.cfg.invalidation_hops);
        let invalidated = cache.invalidate(region);

        info!(
            version = store.version(),
            touched = touched.len(),
            invalidated,
            "decision outcome ingested"
        );
        Ok(IngestReceipt {
            version: store.version(),
            touched,
            invalidated,
        })
    }

    fn plan(
        &self,
        store: &GraphStore,
        outcome: &DecisionOutcome,
    ) -> Result<(Vec<Mutation>, Vec<NodeId>), FeedbackError> {
        match outcome {
            DecisionOutcome::SupplierSwitch {
                component,
                from_supplier,
                to_supplier,
                weight,
                cost_delta_usd,
            } => {
                if from_supplier == to_supplier {
                    return Err(FeedbackError::SameSupplier(to_supplier.clone()));
                }
                if !cost_delta_usd.is_finite() {
                    return Err(FeedbackError::BadAdjustment(*cost_delta_usd));
                }
                let comp = active_of_kind(store, component, NodeKind::Component)?;
                let from = active_of_kind(store, from_supplier, NodeKind::Supplier)?;
                let to = active_of_kind(store, to_supplier, NodeKind::Supplier)?;

                let old_edge = store
                    .outgoing_edges(from)
                    .find(|e| {
                        e.is_active() && e.target == comp && e.relation == Relation::Supplies
                    })
                    .map(|e| e.id)
                    .ok_or_else(|| FeedbackError::MissingSupply {
                        supplier: from_supplier.clone(),
                        component: component.clone(),
                    })?;

                if !(0.0..=1.0).contains(weight) || !weight.is_finite() {
                    return Err(GraphError::InvalidWeight(*weight).into());
                }
                // Capacity is checked again by add_edge, but checking here
                // keeps the batch all-or-nothing: the old edge must not be
                // retired if the replacement would bounce.
                let load = store.outgoing_load(to, Relation::Supplies);
                if load + weight > 1.0 + crate::graph::CAPACITY_EPSILON {
                    return Err(GraphError::CapacityExceeded {
                        node: to_supplier.clone(),
                        relation: Relation::Supplies,
                        attempted: load + weight,
                    }
                    .into());
                }

                let mut mutations = vec![
                    Mutation::RetireEdge(old_edge),
                    Mutation::AddEdge {
                        source: to,
                        target: comp,
                        relation: Relation::Supplies,
                        weight: *weight,
                    },
                ];
                if let Some(cost) = numeric_attr(store, comp, "unit_cost_usd") {
                    let mut patch = AttrMap::new();
                    patch.insert(
                        "unit_cost_usd".to_string(),
                        AttrValue::Float((cost + cost_delta_usd).max(0.0)),
                    );
                    mutations.push(Mutation::PatchAttrs { node: comp, patch });
                }
                Ok((mutations, vec![comp, from, to]))
            }

            DecisionOutcome::PriceRenegotiation {
                contract,
                new_value_usd,
                savings_usd,
            } => {
                if !new_value_usd.is_finite() || !savings_usd.is_finite() {
                    return Err(FeedbackError::BadAdjustment(*new_value_usd));
                }
                let node = active_of_kind(store, contract, NodeKind::Contract)?;
                let realized =
                    numeric_attr(store, node, "savings_realized_usd").unwrap_or(0.0);

                let mut patch = AttrMap::new();
                patch.insert("value_usd".to_string(), AttrValue::Float(*new_value_usd));
                patch.insert(
                    "savings_realized_usd".to_string(),
                    AttrValue::Float(realized + savings_usd),
                );
                Ok((vec![Mutation::PatchAttrs { node, patch }], vec![node]))
            }

            DecisionOutcome::ClaimResolution {
                supplier,
                reliability_delta,
            } => {
                if !reliability_delta.is_finite() {
                    return Err(FeedbackError::BadAdjustment(*reliability_delta));
                }
                let node = active_of_kind(store, supplier, NodeKind::Supplier)?;
                let score = numeric_attr(store, node, "reliability_score").unwrap_or(0.5);

                let mut patch = AttrMap::new();
                patch.insert(
                    "reliability_score".to_string(),
                    AttrValue::Float((score + reliability_delta).clamp(0.0, 1.0)),
                );
                Ok((vec![Mutation::PatchAttrs { node, patch }], vec![node]))
            }
        }
    }
}

fn active_of_kind(
    store: &GraphStore,
    key: &str,
    expected: NodeKind,
) -> Result<NodeId, FeedbackError> {
    let id = store.node_id(key)?;
    let node = store
        .get_node(id)
        .ok_or(GraphError::NodeNotFound(id))?;
    if !node.is_active() || node.kind != expected {
        return Err(FeedbackError::WrongKind {
            key: key.to_string(),
            expected,
        });
    }
    Ok(id)
}

fn numeric_attr(store: &GraphStore, id: NodeId, attr: &str) -> Option<f64> {
    store
        .get_node(id)?
        .get_attr(attr)
        .and_then(|v| v.as_numeric())
}

/// Nodes within `hops` of the touched set, any relation, both directions.
fn invalidation_region(
    snapshot: &GraphSnapshot,
    touched: &[NodeId],
    hops: usize,
) -> FxHashSet<NodeId> {
    let mut region: FxHashSet<NodeId> = touched.iter().copied().collect();
    let mut frontier: Vec<NodeId> = touched.to_vec();
    for _ in 0..hops {
        let mut next = Vec::new();
        for id in frontier {
            for neighbor in snapshot.neighbors(id, None, Direction::Both) {
                if region.insert(neighbor) {
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    region
}

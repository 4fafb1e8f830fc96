//! Peer-relative anomaly scoring
//!
//! A node is scored against its peer group: active nodes of the same kind
//! that share at least one active neighbor under the same relation. Two
//! signals feed the score. The structural signal is the node's embedding
//! distance from the peer centroid, normalized by the mean peer spread.
//! The statistical signal is a robust z-score of an observed price against
//! the peer price distribution (median / MAD). Both are squashed into
//! [0, 1) before combining, so thresholds stay comparable across graphs.
//!
//! Groups smaller than `min_peer_group` never produce a score; the scorer
//! reports low confidence instead of extrapolating from too few peers.

use crate::config::AnomalyConfig;
use crate::embed::{EmbedError, EmbeddingCache};
use crate::graph::{GraphSnapshot, NodeId, NodeKind};
use ndarray::Array1;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::debug;

/// MAD consistency constant for a normal distribution.
const MAD_SCALE: f64 = 1.4826;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node '{0}' is retired")]
    NodeRetired(String),

    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

/// An observed transaction price to score against peers.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub node: NodeId,
    pub unit_price: f64,
    /// Epoch millis; None scores against the current graph only.
    pub observed_at: Option<i64>,
}

/// A completed score for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScore {
    pub node: NodeId,
    /// Embedding distance from the peer centroid, squashed to [0, 1)
    pub structural: f64,
    /// Robust price z-score squashed to [0, 1); None when no price was
    /// observed or too few peers carry price data
    pub statistical: Option<f64>,
    pub combined: f64,
    pub anomalous: bool,
    pub peers: usize,
    pub observed_at: Option<i64>,
}

/// Outcome of scoring one node. Insufficient peers are reported as such,
/// never as a score.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Scored(AnomalyScore),
    LowConfidence {
        node: NodeId,
        peers_found: usize,
        required: usize,
    },
}

impl Verdict {
    pub fn node(&self) -> NodeId {
        match self {
            Verdict::Scored(s) => s.node,
            Verdict::LowConfidence { node, .. } => *node,
        }
    }

    pub fn as_scored(&self) -> Option<&AnomalyScore> {
        match self {
            Verdict::Scored(s) => Some(s),
            Verdict::LowConfidence { .. } => None,
        }
    }
}

/// Default attribute holding a node's reference price, per kind.
fn price_attr(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Supplier => Some("annual_spend_usd"),
        NodeKind::Component => Some("unit_cost_usd"),
        NodeKind::Contract => Some("value_usd"),
        NodeKind::Route => Some("cost_per_kg_usd"),
        NodeKind::Country => None,
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    cfg: AnomalyConfig,
}

impl AnomalyScorer {
    pub fn new(cfg: AnomalyConfig) -> Self {
        AnomalyScorer { cfg }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.cfg
    }

    /// Score a price observation against the node's peer group.
    pub fn score(
        &self,
        snapshot: &GraphSnapshot,
        cache: &EmbeddingCache,
        obs: &PriceObservation,
    ) -> Result<Verdict, ScoreError> {
        self.score_inner(snapshot, cache, obs.node, Some(obs.unit_price), obs.observed_at)
    }

    /// Structural-only score, used by bulk scans where no fresh price
    /// observation exists.
    pub fn score_node(
        &self,
        snapshot: &GraphSnapshot,
        cache: &EmbeddingCache,
        node: NodeId,
    ) -> Result<Verdict, ScoreError> {
        self.score_inner(snapshot, cache, node, None, None)
    }

    /// Score every active node of one kind. Nodes with too few peers come
    /// back as LowConfidence verdicts rather than being silently skipped.
    pub fn scan_kind(
        &self,
        snapshot: &GraphSnapshot,
        cache: &EmbeddingCache,
        kind: NodeKind,
    ) -> Result<Vec<Verdict>, ScoreError> {
        snapshot
            .active_nodes_of_kind(kind)
            .map(|n| self.score_node(snapshot, cache, n.id))
            .collect()
    }

    fn score_inner(
        &self,
        snapshot: &GraphSnapshot,
        cache: &EmbeddingCache,
        node_id: NodeId,
        unit_price: Option<f64>,
        observed_at: Option<i64>,
    ) -> Result<Verdict, ScoreError> {
        let node = snapshot
            .node(node_id)
            .ok_or(ScoreError::UnknownNode(node_id))?;
        if !node.is_active() {
            return Err(ScoreError::NodeRetired(node.key.clone()));
        }

        let peers = peer_group(snapshot, node_id, node.kind);

        // Only peers with a fresh embedding can anchor the centroid.
        let mut peer_vecs: Vec<&Array1<f32>> = Vec::with_capacity(peers.len());
        for peer in &peers {
            match cache.get(*peer, snapshot.version) {
                Ok(v) => peer_vecs.push(v),
                Err(EmbedError::Missing(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if peer_vecs.len() < self.cfg.min_peer_group {
            debug!(
                node = %node.key,
                peers_found = peer_vecs.len(),
                required = self.cfg.min_peer_group,
                "peer group too small, reporting low confidence"
            );
            return Ok(Verdict::LowConfidence {
                node: node_id,
                peers_found: peer_vecs.len(),
                required: self.cfg.min_peer_group,
            });
        }

        let own = cache.get(node_id, snapshot.version)?;
        let structural = self.structural_signal(own, &peer_vecs);

        let statistical = unit_price.and_then(|price| {
            let attr = price_attr(node.kind)?;
            let prices: Vec<f64> = peers
                .iter()
                .filter_map(|p| snapshot.node(*p))
                .filter_map(|p| p.get_attr(attr).and_then(|v| v.as_numeric()))
                .collect();
            if prices.len() < self.cfg.min_peer_group {
                return None;
            }
            Some(self.statistical_signal(price, prices))
        });

        // Weighted blend when both signals exist; the structural signal
        // stands alone otherwise.
        let combined = match statistical {
            Some(p) => {
                let total = self.cfg.structural_weight + self.cfg.statistical_weight;
                (self.cfg.structural_weight * structural + self.cfg.statistical_weight * p) / total
            }
            None => structural,
        };

        Ok(Verdict::Scored(AnomalyScore {
            node: node_id,
            structural,
            statistical,
            combined,
            anomalous: combined >= self.cfg.threshold,
            peers: peer_vecs.len(),
            observed_at,
        }))
    }

    /// Distance from the peer centroid over mean peer spread, squashed so
    /// a typical peer lands near 0.5 and outliers approach 1.
    fn structural_signal(&self, own: &Array1<f32>, peers: &[&Array1<f32>]) -> f64 {
        let dim = own.len();
        let mut centroid = Array1::<f32>::zeros(dim);
        for v in peers {
            centroid += *v;
        }
        centroid /= peers.len() as f32;

        let spread: f64 = peers
            .iter()
            .map(|v| euclidean(v, &centroid))
            .sum::<f64>()
            / peers.len() as f64;
        let ratio = euclidean(own, &centroid) / spread.max(self.cfg.mad_floor);
        ratio / (1.0 + ratio)
    }

    /// Robust z-score of `price` against peer prices, squashed so z = 3
    /// maps to 0.5.
    fn statistical_signal(&self, price: f64, mut prices: Vec<f64>) -> f64 {
        let med = median(&mut prices);
        let mut deviations: Vec<f64> = prices.iter().map(|p| (p - med).abs()).collect();
        let mad = median(&mut deviations);
        let z = (price - med).abs() / (MAD_SCALE * mad).max(self.cfg.mad_floor);
        z / (z + 3.0)
    }
}

/// Active same-kind nodes sharing an active neighbor under the same
/// relation, in id order.
fn peer_group(snapshot: &GraphSnapshot, node: NodeId, kind: NodeKind) -> Vec<NodeId> {
    let mut peers: FxHashSet<NodeId> = FxHashSet::default();

    for edge in snapshot.outgoing_edges(node).filter(|e| e.is_active()) {
        for candidate in snapshot.incoming_edges(edge.target).filter(|e| e.is_active()) {
            if candidate.relation == edge.relation {
                peers.insert(candidate.source);
            }
        }
    }
    for edge in snapshot.incoming_edges(node).filter(|e| e.is_active()) {
        for candidate in snapshot.outgoing_edges(edge.source).filter(|e| e.is_active()) {
            if candidate.relation == edge.relation {
                peers.insert(candidate.target);
            }
        }
    }

    peers.remove(&node);
    let mut peers: Vec<NodeId> = peers
        .into_iter()
        .filter(|p| {
            snapshot
                .node(*p)
                .map_or(false, |n| n.is_active() && n.kind == kind)
        })
        .collect();
    peers.sort_unstable();
    peers
}

fn euclidean(a: &Array1<f32>, b: &Array1<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

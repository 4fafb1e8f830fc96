//! Typed message-passing embedding engine
//!
//! Fixed-round iterative update over explicit per-round vector buffers
//! indexed by dense node index - no recursion, so cycles in the graph cost
//! nothing. Each round reads the previous buffer and writes a fresh one;
//! rayon workers write disjoint slots, so parallel execution cannot perturb
//! the result.

use super::cache::EmbeddingCache;
use super::features;
use super::params::ModelParams;
use super::{CancelToken, EmbedError};
use crate::config::EmbeddingConfig;
use crate::graph::view::{DenseView, ViewFilter, NUM_CHANNELS};
use crate::graph::{Direction, GraphSnapshot, NodeId};
use ndarray::Array1;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

/// Recomputation scope.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Recompute every active node
    Full,
    /// Recompute the subgraph reachable within `hops` of the given nodes,
    /// holding everything outside it at its cached value
    Around { nodes: Vec<NodeId>, hops: usize },
}

pub struct EmbeddingEngine {
    cfg: EmbeddingConfig,
    params: ModelParams,
}

impl EmbeddingEngine {
    pub fn new(cfg: EmbeddingConfig) -> Self {
        let params = ModelParams::init(&cfg);
        EmbeddingEngine { cfg, params }
    }

    /// Use externally trained parameters (same struct the offline trainer
    /// writes). Dimensions must agree with the config.
    pub fn with_params(cfg: EmbeddingConfig, params: ModelParams) -> Result<Self, EmbedError> {
        if params.dim != cfg.dim {
            return Err(EmbedError::DimensionMismatch {
                params: params.dim,
                configured: cfg.dim,
            });
        }
        Ok(EmbeddingEngine { cfg, params })
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.cfg
    }

    /// Compute embeddings for every active node of a snapshot.
    pub fn compute_full(
        &self,
        snapshot: &GraphSnapshot,
        cancel: &CancelToken,
    ) -> Result<FxHashMap<NodeId, Array1<f32>>, EmbedError> {
        let view = DenseView::build(snapshot, &ViewFilter::default());
        let init = self.initial_vectors(snapshot, &view);
        let finals = self.run_rounds(&view, init, None, cancel)?;
        info!(
            nodes = view.node_count,
            rounds = self.cfg.rounds,
            version = snapshot.version,
            "full embedding pass complete"
        );
        Ok(view
            .index_to_node
            .iter()
            .copied()
            .zip(finals)
            .collect())
    }

    /// Recompute into the cache. Full scope replaces the cache wholesale;
    /// bounded scope merges the dirty region, falling back to a full pass
    /// when the region covers too much of the graph. Either way the cache
    /// is only written after the pass completes.
    pub fn recompute(
        &self,
        snapshot: &GraphSnapshot,
        cache: &mut EmbeddingCache,
        scope: Scope,
        cancel: &CancelToken,
    ) -> Result<usize, EmbedError> {
        match scope {
            Scope::Full => {
                let vectors = self.compute_full(snapshot, cancel)?;
                let count = vectors.len();
                cache.replace(snapshot.version, vectors);
                Ok(count)
            }
            Scope::Around { nodes, hops } => {
                let view = DenseView::build(snapshot, &ViewFilter::default());
                let dirty = self.expand_dirty(snapshot, &view, &nodes, hops);
                let fraction = if view.node_count == 0 {
                    0.0
                } else {
                    dirty.len() as f64 / view.node_count as f64
                };
                if fraction > self.cfg.full_recompute_fraction {
                    debug!(
                        dirty = dirty.len(),
                        total = view.node_count,
                        "dirty region too large, falling back to full recompute"
                    );
                    return self.recompute(snapshot, cache, Scope::Full, cancel);
                }

                // Boundary nodes hold their cached vectors; dirty nodes
                // without a cached vector start from their attribute
                // encoding.
                let mut init = self.initial_vectors(snapshot, &view);
                for (idx, id) in view.index_to_node.iter().enumerate() {
                    if !dirty.contains(&idx) {
                        if let Some(cached) = cache.get_unchecked(*id) {
                            init[idx] = cached.clone();
                        }
                    }
                }
                let finals = self.run_rounds(&view, init, Some(&dirty), cancel)?;
                let updated: FxHashMap<NodeId, Array1<f32>> = dirty
                    .iter()
                    .map(|idx| (view.index_to_node[*idx], finals[*idx].clone()))
                    .collect();
                let count = updated.len();
                cache.merge(snapshot.version, updated);
                debug!(
                    updated = count,
                    version = snapshot.version,
                    "incremental embedding recompute merged"
                );
                Ok(count)
            }
        }
    }

    /// Dense indices within `hops` of the seed nodes (any relation, both
    /// directions), seeds included.
    fn expand_dirty(
        &self,
        snapshot: &GraphSnapshot,
        view: &DenseView,
        seeds: &[NodeId],
        hops: usize,
    ) -> FxHashSet<usize> {
        let mut dirty = FxHashSet::default();
        let mut frontier: Vec<NodeId> = Vec::new();
        for seed in seeds {
            if let Some(idx) = view.node_to_index.get(seed) {
                if dirty.insert(*idx) {
                    frontier.push(*seed);
                }
            }
        }
        for _ in 0..hops {
            let mut next = Vec::new();
            for id in frontier.drain(..) {
                for nbr in snapshot.neighbors(id, None, Direction::Both) {
                    if let Some(idx) = view.node_to_index.get(&nbr) {
                        if dirty.insert(*idx) {
                            next.push(nbr);
                        }
                    }
                }
            }
            frontier = next;
        }
        dirty
    }

    /// Deterministic initial vectors from the attribute encoding.
    fn initial_vectors(&self, snapshot: &GraphSnapshot, view: &DenseView) -> Vec<Array1<f32>> {
        let feats = features::encode_all(snapshot, view);
        view.index_to_node
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let kind = snapshot
                    .node(*id)
                    .expect("view ids come from the snapshot")
                    .kind;
                let proj = &self.params.input_proj[kind.ordinal()];
                let raw = Array1::from_vec(feats[idx].clone());
                l2_normalized(proj.dot(&raw))
            })
            .collect()
    }

    /// The fixed-round update loop. When `dirty` is set, only those slots
    /// are rewritten; all others carry their previous value forward.
    fn run_rounds(
        &self,
        view: &DenseView,
        init: Vec<Array1<f32>>,
        dirty: Option<&FxHashSet<usize>>,
        cancel: &CancelToken,
    ) -> Result<Vec<Array1<f32>>, EmbedError> {
        let alpha = self.cfg.self_weight as f32;
        let mut current = init;

        for round in 0..self.cfg.rounds {
            if cancel.is_cancelled() {
                debug!(round, "embedding pass cancelled");
                return Err(EmbedError::Cancelled);
            }
            let next: Vec<Array1<f32>> = (0..view.node_count)
                .into_par_iter()
                .map(|i| {
                    if dirty.map_or(false, |d| !d.contains(&i)) {
                        return current[i].clone();
                    }
                    self.update_node(view, &current, i, alpha)
                })
                .collect();
            current = next;
        }
        Ok(current)
    }

    /// One node's round update: per-channel weighted-mean aggregation,
    /// channel transforms, self transform, tanh, convex blend, renormalize.
    fn update_node(
        &self,
        view: &DenseView,
        current: &[Array1<f32>],
        i: usize,
        alpha: f32,
    ) -> Array1<f32> {
        let dim = self.params.dim;
        // channel accumulators: weighted vector sum and weight mass
        let mut sums: Vec<Option<Array1<f32>>> = vec![None; NUM_CHANNELS];
        let mut mass = [0.0f32; NUM_CHANNELS];
        for msg in &view.messages[i] {
            let contribution = &current[msg.source] * msg.weight as f32;
            match &mut sums[msg.channel] {
                Some(acc) => *acc += &contribution,
                slot => *slot = Some(contribution),
            }
            mass[msg.channel] += msg.weight as f32;
        }

        let mut z = self.params.self_transform.dot(&current[i]);
        for (channel, sum) in sums.into_iter().enumerate() {
            let Some(sum) = sum else { continue };
            if mass[channel] <= 0.0 {
                continue;
            }
            let mean = sum / mass[channel];
            z += &self.params.channel_transform[channel].dot(&mean);
        }

        let gated = z.mapv(f32::tanh);
        let blended = &current[i] * alpha + &gated * (1.0 - alpha);
        debug_assert_eq!(blended.len(), dim);
        l2_normalized(blended)
    }
}

fn l2_normalized(v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 1e-12 {
        v / norm
    } else {
        v
    }
}

//! Aggregator parameters for the typed message-passing computation
//!
//! One input projection per node kind, one transform per relation channel
//! (forward and reverse are parameterized independently), plus a self
//! transform. Initialization is seeded, so a given (seed, dim) pair always
//! yields the same parameters - the determinism contract of the forward
//! pass rests on this. Training happens offline and out of scope; trained
//! parameters load through the same struct.

use crate::config::EmbeddingConfig;
use crate::graph::view::NUM_CHANNELS;
use crate::graph::NodeKind;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Model parameters for the embedding forward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Embedding dimension
    pub dim: usize,
    /// Seed the parameters were initialized from
    pub seed: u64,
    /// Per-kind input projection: dim x feature_len(kind), indexed by
    /// `NodeKind::ordinal`
    pub input_proj: Vec<Array2<f32>>,
    /// Per-channel neighbor transform: dim x dim, indexed by channel
    pub channel_transform: Vec<Array2<f32>>,
    /// Self transform: dim x dim
    pub self_transform: Array2<f32>,
}

impl ModelParams {
    /// Deterministic Glorot-uniform initialization from the config seed.
    pub fn init(cfg: &EmbeddingConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let dim = cfg.dim;

        // Kind order and channel order are canonical, so the draw sequence
        // is stable across runs.
        let input_proj = NodeKind::ALL
            .iter()
            .map(|kind| {
                let cols = super::features::feature_len(*kind);
                glorot(&mut rng, dim, cols)
            })
            .collect();
        let channel_transform = (0..NUM_CHANNELS).map(|_| glorot(&mut rng, dim, dim)).collect();
        let self_transform = glorot(&mut rng, dim, dim);

        ModelParams {
            dim,
            seed: cfg.seed,
            input_proj,
            channel_transform,
            self_transform,
        }
    }
}

fn glorot(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f32> {
    let scale = (6.0 / (rows + cols) as f32).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-scale..scale))
}

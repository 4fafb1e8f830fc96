//! Heterogeneous embedding computation
//!
//! Computes a fixed-dimension vector per active node by iterative typed
//! message passing over a graph snapshot: per-relation-channel aggregation,
//! a convex self blend, and a fixed round count. Deterministic given
//! (snapshot, parameters, rounds).

pub mod cache;
pub mod engine;
pub mod features;
pub mod params;

pub use cache::EmbeddingCache;
pub use engine::{EmbeddingEngine, Scope};
pub use params::ModelParams;

use crate::graph::NodeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors from embedding lookup and recomputation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    #[error(
        "embedding for {node} is stale: cached at graph version {cached_version}, current is {current_version}"
    )]
    Stale {
        node: NodeId,
        cached_version: u64,
        current_version: u64,
    },

    #[error("no cached embedding for {0}; recomputation has not covered it")]
    Missing(NodeId),

    #[error("recomputation cancelled")]
    Cancelled,

    #[error("parameter dimension {params} does not match configured dimension {configured}")]
    DimensionMismatch { params: usize, configured: usize },
}

/// Cooperative cancellation flag, checked between message-passing rounds.
/// Lets a new graph version supersede stale in-flight work without ever
/// corrupting the cache (results are only merged on completion).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

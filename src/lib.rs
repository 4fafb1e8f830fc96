//! Supplier Knowledge Graph Engine
//!
//! An in-memory heterogeneous graph of a supply network (suppliers,
//! components, countries, contracts, routes) with typed message-passing
//! embeddings, peer-relative anomaly scoring, disruption propagation
//! simulation, a decision-outcome feedback loop, and checksummed snapshot
//! persistence.
//!
//! The engine follows a single-writer model: mutations go through
//! [`SupplyGraphEngine`] (or a raw [`graph::GraphStore`]) and bump a
//! monotone graph version; analytical readers work off immutable,
//! version-pinned snapshots, so a long-running computation never observes
//! a half-applied change. Embeddings carry the version they were computed
//! against and reads refuse to serve stale vectors.
//!
//! ## Example Usage
//!
//! ```rust
//! use supplygraph::config::EngineConfig;
//! use supplygraph::embed::Scope;
//! use supplygraph::graph::{AttrMap, NodeKind, Relation};
//! use supplygraph::SupplyGraphEngine;
//!
//! let engine = SupplyGraphEngine::new(EngineConfig::default()).unwrap();
//!
//! engine.add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new()).unwrap();
//! engine.add_node(NodeKind::Component, "COMP_0001", AttrMap::new()).unwrap();
//! engine
//!     .add_edge("SUP_0001", "COMP_0001", Relation::Supplies, 0.8, None)
//!     .unwrap();
//!
//! engine.refresh_embeddings(Scope::Full).unwrap();
//! let vector = engine.get_embedding("SUP_0001").unwrap();
//! assert_eq!(vector.len(), engine.config().embedding.dim);
//!
//! let report = engine.simulate_disruption("SUP_0001", 1.0, None).unwrap();
//! assert!(report.converged);
//! ```

#![warn(clippy::all)]

pub mod anomaly;
pub mod config;
pub mod embed;
pub mod engine;
pub mod feedback;
pub mod graph;
pub mod logging;
pub mod persistence;
pub mod propagate;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::{EngineError, EngineResult, LineageEntry, SupplyGraphEngine};
pub use graph::{
    AttrMap, AttrValue, Edge, EdgeId, GraphError, GraphResult, GraphSnapshot, GraphStore, Node,
    NodeId, NodeKind, Relation,
};

pub use anomaly::{AnomalyScore, AnomalyScorer, PriceObservation, Verdict};
pub use embed::{CancelToken, EmbeddingCache, EmbeddingEngine, ModelParams, Scope};
pub use feedback::{DecisionOutcome, FeedbackIngestor, IngestReceipt};
pub use persistence::SnapshotStore;
pub use propagate::{GraphOverlay, ImpactReport, PropagationSimulator};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

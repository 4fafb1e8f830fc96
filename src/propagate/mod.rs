//! Disruption propagation over the supply graph
//!
//! Models how a disruption at one or more origin nodes spreads downstream:
//! impact flows along active edges in their forward direction, attenuated
//! by edge weight and a per-hop decay, until the impact field stabilizes
//! or a hard step ceiling is hit. Counterfactual overlays let callers ask
//! "what if" questions (a supplier gone, a route degraded) without
//! mutating the graph.

pub mod overlay;
pub mod simulator;

pub use overlay::GraphOverlay;
pub use simulator::{ImpactEntry, ImpactReport, PropagationSimulator};

use crate::graph::Relation;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{0}' is retired")]
    NodeRetired(String),

    #[error("no active {relation} edge from '{src}' to '{target}'")]
    UnknownEdge {
        src: String,
        target: String,
        relation: Relation,
    },

    #[error("severity {0} outside (0, 1]")]
    InvalidSeverity(f64),

    #[error("override weight {0} outside [0, 1]")]
    InvalidWeight(f64),

    #[error("no disruption seeds given")]
    NoSeeds,

    #[error("origin '{0}' is excluded by the overlay")]
    OriginRemoved(String),
}

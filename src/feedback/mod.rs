//! Decision-outcome feedback loop
//!
//! Procurement decisions made off the engine's recommendations come back
//! as structured outcomes and are folded into the graph, so later scoring
//! and simulation see the world as it actually unfolded.

pub mod ingestor;

pub use ingestor::{DecisionOutcome, FeedbackError, FeedbackIngestor, IngestReceipt};

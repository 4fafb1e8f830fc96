//! Price and structure anomaly scoring

pub mod scorer;

pub use scorer::{AnomalyScore, AnomalyScorer, PriceObservation, ScoreError, Verdict};

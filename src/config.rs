//! Engine configuration
//!
//! All knobs the spec leaves open (round counts, tolerances, decay, peer
//! minimums) live here with serde defaults, loadable from a YAML file in
//! the same shape as the original `params.yaml` sections.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub embedding: EmbeddingConfig,
    pub anomaly: AnomalyConfig,
    pub propagation: PropagationConfig,
    pub feedback: FeedbackConfig,
}

impl EngineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = serde_yaml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.anomaly.validate()?;
        self.propagation.validate()?;
        Ok(())
    }
}

/// Embedding engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Output vector dimension
    pub dim: usize,
    /// Message-passing rounds (fixed count, no early exit - keeps the
    /// forward pass trivially deterministic)
    pub rounds: usize,
    /// Convex blend weight on the previous vector; keeps isolated nodes
    /// from collapsing to zero
    pub self_weight: f64,
    /// Seed for parameter initialization. The forward pass itself draws no
    /// randomness.
    pub seed: u64,
    /// Hop radius for incremental recomputation around changed nodes
    pub recompute_hops: usize,
    /// Dirty-fraction above which incremental recomputation falls back to
    /// a full pass
    pub full_recompute_fraction: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            dim: 32,
            rounds: 3,
            self_weight: 0.6,
            seed: 42,
            recompute_hops: 2,
            full_recompute_fraction: 0.3,
        }
    }
}

impl EmbeddingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dim == 0 {
            return Err(ConfigError::Invalid("embedding.dim must be > 0".into()));
        }
        if self.rounds == 0 {
            return Err(ConfigError::Invalid("embedding.rounds must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.self_weight) || self.self_weight <= 0.0 {
            return Err(ConfigError::Invalid(
                "embedding.self_weight must be in (0, 1)".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.full_recompute_fraction) {
            return Err(ConfigError::Invalid(
                "embedding.full_recompute_fraction must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Anomaly scorer knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Minimum peer-group size below which scoring reports LowConfidence
    pub min_peer_group: usize,
    /// Combined-score threshold for the anomalous classification
    pub threshold: f64,
    /// Weight on the structural (embedding-distance) signal
    pub structural_weight: f64,
    /// Weight on the statistical (price-deviation) signal
    pub statistical_weight: f64,
    /// Floor on the median absolute deviation, guarding division by zero
    /// on degenerate peer groups
    pub mad_floor: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        AnomalyConfig {
            min_peer_group: 3,
            threshold: 0.6,
            structural_weight: 0.5,
            statistical_weight: 0.5,
            mad_floor: 1e-6,
        }
    }
}

impl AnomalyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_peer_group == 0 {
            return Err(ConfigError::Invalid(
                "anomaly.min_peer_group must be > 0".into(),
            ));
        }
        if self.mad_floor <= 0.0 {
            return Err(ConfigError::Invalid("anomaly.mad_floor must be > 0".into()));
        }
        Ok(())
    }
}

/// How inbound neighbor impacts are combined in the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Maximum inbound contribution (default)
    #[default]
    Max,
    /// Weighted sum of inbound contributions, clamped to 1
    WeightedSum,
}

/// Propagation simulator knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Per-hop decay factor, strictly < 1 so propagated impact shrinks with
    /// hop distance and the simulation terminates
    pub decay: f64,
    /// Decay on a node's own held impact between steps (1.0 = impacts are
    /// held once acquired)
    pub retention: f64,
    /// Convergence tolerance on the max per-node impact change
    pub tolerance: f64,
    /// Hard ceiling on simulated steps, always enforced
    pub max_steps: u32,
    /// Impact level above which a node counts as materially affected
    pub impact_threshold: f64,
    pub combine: CombineMode,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig {
            decay: 0.5,
            retention: 1.0,
            tolerance: 1e-4,
            max_steps: 50,
            impact_threshold: 0.05,
            combine: CombineMode::Max,
        }
    }
}

impl PropagationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0 < self.decay && self.decay < 1.0) {
            return Err(ConfigError::Invalid(
                "propagation.decay must be in (0, 1)".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retention) {
            return Err(ConfigError::Invalid(
                "propagation.retention must be in [0, 1]".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid(
                "propagation.max_steps must be > 0".into(),
            ));
        }
        if self.tolerance <= 0.0 {
            return Err(ConfigError::Invalid(
                "propagation.tolerance must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Feedback ingestion knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Hop radius for embedding-cache invalidation around touched nodes
    pub invalidation_hops: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        FeedbackConfig {
            invalidation_hops: 2,
        }
    }
}

//! Synchronous-round impact propagation
//!
//! Each round, every node combines its held impact with inbound
//! contributions `impact(source) * edge_weight * decay` over active
//! forward edges. With decay strictly below 1 the field is monotone
//! bounded and stabilizes; a hard step ceiling guards degenerate configs.
//! Rounds are synchronous (all nodes update from the previous field), so
//! results are independent of iteration order.

use super::SimError;
use crate::config::{CombineMode, PropagationConfig};
use crate::graph::{DenseView, GraphSnapshot, NodeId, ViewFilter};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Impact on one node above the reporting threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactEntry {
    pub node: NodeId,
    pub key: String,
    /// Final impact level in [0, 1]
    pub impact: f64,
    /// First step at which impact crossed the reporting threshold
    /// (0 = seeded)
    pub first_affected_step: u32,
}

/// Result of one simulation run.
#[derive(Debug, Clone)]
pub struct ImpactReport {
    pub origins: Vec<NodeId>,
    pub steps_run: u32,
    /// False when the step ceiling cut the run short of the tolerance
    pub converged: bool,
    /// Affected nodes, highest impact first
    pub impacts: Vec<ImpactEntry>,
}

impl ImpactReport {
    pub fn affected_count(&self) -> usize {
        self.impacts.len()
    }

    pub fn impact_of(&self, node: NodeId) -> Option<f64> {
        self.impacts
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.impact)
    }
}

#[derive(Debug, Clone)]
pub struct PropagationSimulator {
    cfg: PropagationConfig,
}

impl PropagationSimulator {
    pub fn new(cfg: PropagationConfig) -> Self {
        PropagationSimulator { cfg }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.cfg
    }

    /// Run a simulation seeded with `(origin, severity)` pairs under a
    /// resolved overlay filter.
    pub fn simulate(
        &self,
        snapshot: &GraphSnapshot,
        seeds: &[(NodeId, f64)],
        filter: &ViewFilter,
    ) -> Result<ImpactReport, SimError> {
        if seeds.is_empty() {
            return Err(SimError::NoSeeds);
        }
        for (id, severity) in seeds {
            let node = snapshot
                .node(*id)
                .ok_or_else(|| SimError::UnknownNode(id.to_string()))?;
            if !node.is_active() {
                return Err(SimError::NodeRetired(node.key.clone()));
            }
            if filter.removed_nodes.contains(id) {
                return Err(SimError::OriginRemoved(node.key.clone()));
            }
            if !(0.0 < *severity && *severity <= 1.0) || !severity.is_finite() {
                return Err(SimError::InvalidSeverity(*severity));
            }
        }

        let view = DenseView::build(snapshot, filter);
        let n = view.node_count;

        let mut prev = vec![0.0f64; n];
        for (id, severity) in seeds {
            // seeds are validated active and not removed, so present here
            if let Some(&idx) = view.node_to_index.get(id) {
                prev[idx] = prev[idx].max(*severity);
            }
        }

        let mut first_affected: Vec<Option<u32>> = prev
            .iter()
            .map(|&v| (v >= self.cfg.impact_threshold).then_some(0))
            .collect();

        let mut steps_run = 0;
        let mut converged = false;
        for step in 1..=self.cfg.max_steps {
            let next: Vec<f64> = (0..n)
                .into_par_iter()
                .map(|i| self.update(&view, &prev, i))
                .collect();

            let mut max_delta = 0.0f64;
            for i in 0..n {
                max_delta = max_delta.max((next[i] - prev[i]).abs());
                if first_affected[i].is_none() && next[i] >= self.cfg.impact_threshold {
                    first_affected[i] = Some(step);
                }
            }

            prev = next;
            steps_run = step;
            if max_delta < self.cfg.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                max_steps = self.cfg.max_steps,
                tolerance = self.cfg.tolerance,
                "propagation hit the step ceiling before stabilizing"
            );
        }

        let mut impacts: Vec<ImpactEntry> = (0..n)
            .filter(|&i| prev[i] >= self.cfg.impact_threshold)
            .map(|i| {
                let node = view.index_to_node[i];
                ImpactEntry {
                    node,
                    key: snapshot
                        .node(node)
                        .map(|n| n.key.clone())
                        .unwrap_or_default(),
                    impact: prev[i],
                    first_affected_step: first_affected[i].unwrap_or(steps_run),
                }
            })
            .collect();
        impacts.sort_by(|a, b| b.impact.total_cmp(&a.impact).then(a.node.cmp(&b.node)));

        debug!(
            seeds = seeds.len(),
            steps_run,
            converged,
            affected = impacts.len(),
            "propagation finished"
        );

        Ok(ImpactReport {
            origins: seeds.iter().map(|(id, _)| *id).collect(),
            steps_run,
            converged,
            impacts,
        })
    }

    // Held impact floors the update; the combine mode only governs how
    // inbound contributions aggregate. Re-adding inbound mass to the held
    // level each round would never stabilize under full retention.
    fn update(&self, view: &DenseView, prev: &[f64], i: usize) -> f64 {
        let held = prev[i] * self.cfg.retention;
        let inbound = match self.cfg.combine {
            CombineMode::Max => view
                .inbound(i)
                .map(|m| prev[m.source] * m.weight * self.cfg.decay)
                .fold(0.0, f64::max),
            CombineMode::WeightedSum => view
                .inbound(i)
                .map(|m| prev[m.source] * m.weight * self.cfg.decay)
                .sum::<f64>()
                .min(1.0),
        };
        held.max(inbound)
    }
}

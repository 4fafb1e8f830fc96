//! Engine facade
//!
//! Single entry point tying the store, embedding engine, scorer, simulator
//! and feedback loop together under one locking discipline: one writer
//! mutates the live store, readers work off immutable snapshots. Every
//! accepted mutation bumps the graph version; embeddings are recomputed
//! against a snapshot and merged back only if still current, with an
//! in-flight recompute superseded by cancelling its token.

use crate::anomaly::{AnomalyScorer, PriceObservation, ScoreError, Verdict};
use crate::config::{ConfigError, EngineConfig};
use crate::embed::{
    CancelToken, EmbedError, EmbeddingCache, EmbeddingEngine, ModelParams, Scope,
};
use crate::feedback::{DecisionOutcome, FeedbackError, FeedbackIngestor, IngestReceipt};
use crate::graph::{
    AttrMap, EdgeId, GraphError, GraphSnapshot, GraphStats, GraphStore, NodeId, NodeKind,
    Relation, Validity,
};
use crate::persistence::{PersistError, SnapshotStore};
use crate::propagate::{GraphOverlay, ImpactReport, PropagationSimulator, SimError};
use ndarray::Array1;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Scoring(#[from] ScoreError),

    #[error(transparent)]
    Simulation(#[from] SimError),

    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error(transparent)]
    Persistence(#[from] PersistError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// One upstream contributor to a node, reached over incoming edges.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageEntry {
    pub node: NodeId,
    pub key: String,
    /// Relation of the strongest path's final hop
    pub relation: Relation,
    /// Product of edge weights along the strongest path
    pub weight: f64,
    pub depth: usize,
    pub retired: bool,
}

// Upstream traversal depth guard for weight-1.0 cycles.
const LINEAGE_MAX_DEPTH: usize = 32;

pub struct SupplyGraphEngine {
    cfg: EngineConfig,
    store: RwLock<GraphStore>,
    cache: RwLock<EmbeddingCache>,
    embedder: EmbeddingEngine,
    scorer: AnomalyScorer,
    simulator: PropagationSimulator,
    ingestor: FeedbackIngestor,
    /// Token of the in-flight recompute, superseded on each refresh
    cancel: Mutex<CancelToken>,
}

impl SupplyGraphEngine {
    pub fn new(cfg: EngineConfig) -> EngineResult<Self> {
        cfg.validate()?;
        let embedder = EmbeddingEngine::new(cfg.embedding.clone());
        Ok(SupplyGraphEngine {
            store: RwLock::new(GraphStore::new()),
            cache: RwLock::new(EmbeddingCache::empty(cfg.embedding.dim)),
            scorer: AnomalyScorer::new(cfg.anomaly.clone()),
            simulator: PropagationSimulator::new(cfg.propagation.clone()),
            ingestor: FeedbackIngestor::new(cfg.feedback.clone()),
            cancel: Mutex::new(CancelToken::new()),
            embedder,
            cfg,
        })
    }

    /// Restore an engine from the latest snapshot in `snaps`.
    pub fn load(snaps: &SnapshotStore, cfg: EngineConfig) -> EngineResult<Self> {
        cfg.validate()?;
        let state = snaps.load_latest()?;
        let embedder = EmbeddingEngine::with_params(cfg.embedding.clone(), state.params)?;
        info!(version = state.store.version(), "engine restored from snapshot");
        Ok(SupplyGraphEngine {
            store: RwLock::new(state.store),
            cache: RwLock::new(state.cache),
            scorer: AnomalyScorer::new(cfg.anomaly.clone()),
            simulator: PropagationSimulator::new(cfg.propagation.clone()),
            ingestor: FeedbackIngestor::new(cfg.feedback.clone()),
            cancel: Mutex::new(CancelToken::new()),
            embedder,
            cfg,
        })
    }

    /// Persist the current state as one snapshot file.
    pub fn save(&self, snaps: &SnapshotStore) -> EngineResult<PathBuf> {
        let store = self.read_store();
        let cache = self.read_cache();
        Ok(snaps.save(&store, &cache, self.embedder.params())?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn version(&self) -> u64 {
        self.read_store().version()
    }

    /// Immutable view pinned to the current version.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.read_store().snapshot()
    }

    pub fn stats(&self) -> GraphStats {
        self.snapshot().stats()
    }

    // ------------------------------------------------------------ mutations

    pub fn add_node(
        &self,
        kind: NodeKind,
        key: impl Into<String>,
        attrs: AttrMap,
    ) -> EngineResult<NodeId> {
        Ok(self.write_store().add_node(kind, key, attrs)?)
    }

    pub fn add_edge(
        &self,
        source_key: &str,
        target_key: &str,
        relation: Relation,
        weight: f64,
        validity: Option<Validity>,
    ) -> EngineResult<EdgeId> {
        let mut store = self.write_store();
        let source = store.node_id(source_key)?;
        let target = store.node_id(target_key)?;
        Ok(store.add_edge(source, target, relation, weight, validity)?)
    }

    pub fn update_attrs(&self, key: &str, patch: AttrMap) -> EngineResult<()> {
        let mut store = self.write_store();
        let id = store.node_id(key)?;
        Ok(store.update_attrs(id, patch)?)
    }

    pub fn retire_node(&self, key: &str) -> EngineResult<()> {
        let mut store = self.write_store();
        let id = store.node_id(key)?;
        Ok(store.retire_node(id)?)
    }

    pub fn retire_edge(&self, id: EdgeId) -> EngineResult<()> {
        Ok(self.write_store().retire_edge(id)?)
    }

    /// Materialize CO_SUPPLIER and TRADES_WITH edges implied by the
    /// current active graph. Returns the number of edges added.
    pub fn derive_relations(&self) -> EngineResult<usize> {
        Ok(self.write_store().derive_relations()?)
    }

    /// Fold a decision outcome into the graph, then recompute embeddings
    /// around the touched region.
    pub fn record_decision_outcome(
        &self,
        outcome: &DecisionOutcome,
    ) -> EngineResult<IngestReceipt> {
        let receipt = {
            let mut store = self.write_store();
            let mut cache = self.write_cache();
            self.ingestor.ingest(&mut store, &mut cache, outcome)?
        };
        self.refresh_embeddings(Scope::Around {
            nodes: receipt.touched.clone(),
            hops: self.cfg.embedding.recompute_hops,
        })?;
        Ok(receipt)
    }

    // ----------------------------------------------------------- embeddings

    /// Recompute embeddings for the given scope against the current
    /// version. Supersedes any recompute still in flight. Returns the
    /// number of vectors written.
    pub fn refresh_embeddings(&self, scope: Scope) -> EngineResult<usize> {
        let token = self.supersede();
        let snapshot = self.snapshot();
        let mut cache = self.write_cache();
        Ok(self.embedder.recompute(&snapshot, &mut cache, scope, &token)?)
    }

    /// Cancel whatever recompute is in flight and install a fresh token.
    fn supersede(&self) -> CancelToken {
        let mut slot = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        slot.cancel();
        *slot = CancelToken::new();
        slot.clone()
    }

    /// Fresh embedding for one node. `Stale` or `Missing` means a refresh
    /// is due.
    pub fn get_embedding(&self, key: &str) -> EngineResult<Array1<f32>> {
        let store = self.read_store();
        let id = store.node_id(key)?;
        let cache = self.read_cache();
        Ok(cache.get(id, store.version())?.clone())
    }

    // -------------------------------------------------------------- scoring

    /// Score a price observation for the node at `key`.
    pub fn score_price(
        &self,
        key: &str,
        unit_price: f64,
        observed_at: Option<i64>,
    ) -> EngineResult<Verdict> {
        let snapshot = self.snapshot();
        let node = snapshot
            .node_id(key)
            .ok_or_else(|| GraphError::UnknownKey(key.to_string()))?;
        let cache = self.read_cache();
        Ok(self.scorer.score(
            &snapshot,
            &cache,
            &PriceObservation {
                node,
                unit_price,
                observed_at,
            },
        )?)
    }

    /// Structural anomaly scan over all active nodes of one kind.
    pub fn get_anomalies(&self, kind: NodeKind) -> EngineResult<Vec<Verdict>> {
        let snapshot = self.snapshot();
        let cache = self.read_cache();
        Ok(self.scorer.scan_kind(&snapshot, &cache, kind)?)
    }

    // ----------------------------------------------------------- simulation

    /// Simulate a disruption of `severity` at `origin_key`, optionally
    /// under a counterfactual overlay.
    pub fn simulate_disruption(
        &self,
        origin_key: &str,
        severity: f64,
        overlay: Option<&GraphOverlay>,
    ) -> EngineResult<ImpactReport> {
        let snapshot = self.snapshot();
        let origin = snapshot
            .node_id(origin_key)
            .ok_or_else(|| SimError::UnknownNode(origin_key.to_string()))?;
        let filter = match overlay {
            Some(o) => o.resolve(&snapshot)?,
            None => Default::default(),
        };
        Ok(self
            .simulator
            .simulate(&snapshot, &[(origin, severity)], &filter)?)
    }

    // -------------------------------------------------------------- lineage

    /// Upstream contributors of a node: every node with a path of edges
    /// into it, ranked by the strongest path (product of edge weights).
    /// Retired edges and nodes are skipped unless `include_retired`.
    pub fn get_lineage(&self, key: &str, include_retired: bool) -> EngineResult<Vec<LineageEntry>> {
        let snapshot = self.snapshot();
        let target = snapshot
            .node_id(key)
            .ok_or_else(|| GraphError::UnknownKey(key.to_string()))?;

        let mut best: FxHashMap<NodeId, (f64, usize, Relation)> = FxHashMap::default();
        let mut frontier: Vec<(NodeId, f64, usize)> = vec![(target, 1.0, 0)];
        while let Some((node, path_weight, depth)) = frontier.pop() {
            if depth >= LINEAGE_MAX_DEPTH {
                continue;
            }
            for edge in snapshot.incoming_edges(node) {
                if !include_retired && !edge.is_active() {
                    continue;
                }
                let source = snapshot.node(edge.source);
                let Some(source) = source else { continue };
                if !include_retired && !source.is_active() {
                    continue;
                }
                let w = path_weight * edge.weight;
                let stronger = best
                    .get(&source.id)
                    .map_or(true, |(existing, _, _)| w > *existing);
                if stronger && source.id != target {
                    best.insert(source.id, (w, depth + 1, edge.relation));
                    frontier.push((source.id, w, depth + 1));
                }
            }
        }

        let mut entries: Vec<LineageEntry> = best
            .into_iter()
            .filter_map(|(id, (weight, depth, relation))| {
                let node = snapshot.node(id)?;
                Some(LineageEntry {
                    node: id,
                    key: node.key.clone(),
                    relation,
                    weight,
                    depth,
                    retired: !node.is_active(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.node.cmp(&b.node)));
        Ok(entries)
    }

    // ---------------------------------------------------------------- locks

    fn read_store(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, EmbeddingCache> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, EmbeddingCache> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }

    #[doc(hidden)]
    pub fn model_params(&self) -> &ModelParams {
        self.embedder.params()
    }
}

//! In-memory graph storage
//!
//! Owns the heterogeneous graph: typed nodes, typed weighted edges, and the
//! monotonically increasing version counter. All invariants are enforced at
//! the mutation boundary, atomically: a rejected mutation leaves the store
//! at its pre-call version with no partial state.

use super::attr::AttrMap;
use super::edge::Edge;
use super::node::Node;
use super::schema::{self, SchemaViolation};
use super::snapshot::GraphSnapshot;
use super::types::{Direction, EdgeId, NodeId, NodeKind, Relation, Validity};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Tolerance on the SUPPLIES outgoing-weight sum. Floating point only;
/// never used to admit a genuinely over-capacity insertion.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// Errors that can occur during graph mutations and lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node key '{0}' already exists")]
    DuplicateId(String),

    #[error("unknown node key '{0}'")]
    UnknownKey(String),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("node '{0}' is retired")]
    NodeRetired(String),

    #[error("edge {0} is retired")]
    EdgeRetired(EdgeId),

    #[error("edge weight {0} outside [0, 1]")]
    InvalidWeight(f64),

    #[error(
        "outgoing {relation} weights from '{node}' would sum to {attempted:.4}, limit is 1.0"
    )]
    CapacityExceeded {
        node: String,
        relation: Relation,
        attempted: f64,
    },

    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph store.
///
/// Arena layout: `NodeId`/`EdgeId` are dense indices into `nodes`/`edges`,
/// with adjacency lists per node. Elements are never physically removed;
/// retirement is a soft-delete marker so history stays queryable for
/// lineage.
#[derive(Debug, Default)]
pub struct GraphStore {
    /// Node storage (arena: NodeId -> Node)
    nodes: Vec<Node>,

    /// Edge storage (arena: EdgeId -> Edge)
    edges: Vec<Edge>,

    /// External key -> internal id
    key_index: FxHashMap<String, NodeId>,

    /// Outgoing edges for each node (adjacency list)
    outgoing: Vec<Vec<EdgeId>>,

    /// Incoming edges for each node (adjacency list)
    incoming: Vec<Vec<EdgeId>>,

    /// Kind index for fast per-kind scans
    kind_index: FxHashMap<NodeKind, FxHashSet<NodeId>>,

    /// Current graph version, bumped exactly once per accepted mutation
    version: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore {
            nodes: Vec::with_capacity(1024),
            edges: Vec::with_capacity(4096),
            key_index: FxHashMap::default(),
            outgoing: Vec::with_capacity(1024),
            incoming: Vec::with_capacity(1024),
            kind_index: FxHashMap::default(),
            version: 1,
        }
    }

    /// Current graph version. Strictly increases across accepted mutations.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    // ---------------------------------------------------------------- nodes

    /// Insert a node with a caller-supplied key. Rejects duplicate keys and
    /// schema violations without touching the version counter.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        key: impl Into<String>,
        attrs: AttrMap,
    ) -> GraphResult<NodeId> {
        let key = key.into();
        if self.key_index.contains_key(&key) {
            return Err(GraphError::DuplicateId(key));
        }
        schema::validate_attrs(kind, &attrs)?;

        let id = NodeId::new(self.nodes.len() as u64);
        let mut node = Node::new(id, key.clone(), kind, attrs);
        node.version = self.bump_version();

        self.key_index.insert(key, id);
        self.kind_index.entry(kind).or_default().insert(id);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());

        debug!(%id, kind = %kind, version = self.version, "node added");
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_node_by_key(&self, key: &str) -> Option<&Node> {
        self.key_index.get(key).and_then(|id| self.get_node(*id))
    }

    pub fn node_id(&self, key: &str) -> GraphResult<NodeId> {
        self.key_index
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::UnknownKey(key.to_string()))
    }

    /// Merge an attribute patch into a node. The whole patch is validated
    /// before anything is applied; one version bump on success.
    pub fn update_attrs(&mut self, id: NodeId, patch: AttrMap) -> GraphResult<()> {
        let node = self
            .nodes
            .get(id.index())
            .ok_or(GraphError::NodeNotFound(id))?;
        if !node.is_active() {
            return Err(GraphError::NodeRetired(node.key.clone()));
        }
        schema::validate_attrs(node.kind, &patch)?;

        let version = self.bump_version();
        let node = &mut self.nodes[id.index()];
        for (key, value) in patch {
            node.set_attr(key, value);
        }
        node.version = version;
        debug!(%id, version, "node attributes updated");
        Ok(())
    }

    /// Soft-delete a node and its active incident edges in one version bump.
    pub fn retire_node(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self
            .nodes
            .get(id.index())
            .ok_or(GraphError::NodeNotFound(id))?;
        if !node.is_active() {
            return Err(GraphError::NodeRetired(node.key.clone()));
        }

        let version = self.bump_version();
        let incident: Vec<EdgeId> = self.outgoing[id.index()]
            .iter()
            .chain(self.incoming[id.index()].iter())
            .copied()
            .collect();
        for eid in incident {
            let edge = &mut self.edges[eid.index()];
            if edge.is_active() {
                edge.retire();
                edge.version = version;
            }
        }
        let node = &mut self.nodes[id.index()];
        node.retire();
        node.version = version;

        debug!(%id, version, "node retired");
        Ok(())
    }

    // ---------------------------------------------------------------- edges

    /// Insert a directed edge. Rejects dangling endpoints, retired
    /// endpoints, out-of-range weights, endpoint-kind mismatches, and
    /// SUPPLIES capacity violations - all before the version bump.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        relation: Relation,
        weight: f64,
        validity: Option<Validity>,
    ) -> GraphResult<EdgeId> {
        let src = self
            .nodes
            .get(source.index())
            .ok_or(GraphError::NodeNotFound(source))?;
        let dst = self
            .nodes
            .get(target.index())
            .ok_or(GraphError::NodeNotFound(target))?;
        if !src.is_active() {
            return Err(GraphError::NodeRetired(src.key.clone()));
        }
        if !dst.is_active() {
            return Err(GraphError::NodeRetired(dst.key.clone()));
        }
        if !(0.0..=1.0).contains(&weight) || !weight.is_finite() {
            return Err(GraphError::InvalidWeight(weight));
        }
        schema::validate_endpoints(relation, src.kind, dst.kind)?;

        if relation.is_capacity_constrained() {
            let load = self.outgoing_load(source, relation);
            if load + weight > 1.0 + CAPACITY_EPSILON {
                return Err(GraphError::CapacityExceeded {
                    node: src.key.clone(),
                    relation,
                    attempted: load + weight,
                });
            }
        }

        let id = EdgeId::new(self.edges.len() as u64);
        let mut edge = Edge::new(id, source, target, relation, weight, validity);
        edge.version = self.bump_version();

        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);
        self.edges.push(edge);

        debug!(%id, relation = %relation, weight, version = self.version, "edge added");
        Ok(id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Soft-delete an edge.
    pub fn retire_edge(&mut self, id: EdgeId) -> GraphResult<()> {
        let edge = self
            .edges
            .get(id.index())
            .ok_or(GraphError::EdgeNotFound(id))?;
        if !edge.is_active() {
            return Err(GraphError::EdgeRetired(id));
        }
        let version = self.bump_version();
        let edge = &mut self.edges[id.index()];
        edge.retire();
        edge.version = version;
        debug!(%id, version, "edge retired");
        Ok(())
    }

    /// Update the weight of an active edge, re-checking the capacity
    /// invariant with the old weight excluded.
    pub fn update_edge_weight(&mut self, id: EdgeId, weight: f64) -> GraphResult<()> {
        let edge = self
            .edges
            .get(id.index())
            .ok_or(GraphError::EdgeNotFound(id))?;
        if !edge.is_active() {
            return Err(GraphError::EdgeRetired(id));
        }
        if !(0.0..=1.0).contains(&weight) || !weight.is_finite() {
            return Err(GraphError::InvalidWeight(weight));
        }
        if edge.relation.is_capacity_constrained() {
            let load = self.outgoing_load(edge.source, edge.relation) - edge.weight;
            if load + weight > 1.0 + CAPACITY_EPSILON {
                return Err(GraphError::CapacityExceeded {
                    node: self.nodes[edge.source.index()].key.clone(),
                    relation: edge.relation,
                    attempted: load + weight,
                });
            }
        }
        let version = self.bump_version();
        let edge = &mut self.edges[id.index()];
        edge.weight = weight;
        edge.version = version;
        debug!(%id, weight, version, "edge weight updated");
        Ok(())
    }

    /// Sum of active outgoing weights of `relation` from `node`.
    pub fn outgoing_load(&self, node: NodeId, relation: Relation) -> f64 {
        self.outgoing
            .get(node.index())
            .map(|edges| {
                edges
                    .iter()
                    .map(|eid| &self.edges[eid.index()])
                    .filter(|e| e.is_active() && e.relation == relation)
                    .map(|e| e.weight)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    // ---------------------------------------------------- derived relations

    fn has_active_edge(&self, source: NodeId, target: NodeId, relation: Relation) -> bool {
        self.outgoing[source.index()]
            .iter()
            .map(|eid| &self.edges[eid.index()])
            .any(|e| e.is_active() && e.target == target && e.relation == relation)
    }

    /// Materialize relations implied by the current active graph:
    /// CO_SUPPLIER between suppliers sharing an active SUPPLIES target
    /// (both directions) and TRADES_WITH from each route's origin country
    /// to its destination country. Pairs already connected are skipped;
    /// one version bump per edge actually added. Returns the number added.
    pub fn derive_relations(&mut self) -> GraphResult<usize> {
        let mut planned: Vec<(NodeId, NodeId, Relation)> = Vec::new();

        for node in &self.nodes {
            if !node.is_active() {
                continue;
            }
            match node.kind {
                NodeKind::Component => {
                    let suppliers: Vec<NodeId> = self.incoming[node.id.index()]
                        .iter()
                        .map(|eid| &self.edges[eid.index()])
                        .filter(|e| e.is_active() && e.relation == Relation::Supplies)
                        .filter(|e| self.nodes[e.source.index()].is_active())
                        .map(|e| e.source)
                        .collect();
                    for (i, &a) in suppliers.iter().enumerate() {
                        for &b in &suppliers[i + 1..] {
                            planned.push((a, b, Relation::CoSupplier));
                            planned.push((b, a, Relation::CoSupplier));
                        }
                    }
                }
                NodeKind::Route => {
                    let ends = |relation: Relation| -> Vec<NodeId> {
                        self.outgoing[node.id.index()]
                            .iter()
                            .map(|eid| &self.edges[eid.index()])
                            .filter(|e| e.is_active() && e.relation == relation)
                            .filter(|e| self.nodes[e.target.index()].is_active())
                            .map(|e| e.target)
                            .collect()
                    };
                    let origins = ends(Relation::OriginatesIn);
                    let dests = ends(Relation::DeliversTo);
                    for &origin in &origins {
                        for &dest in &dests {
                            if origin != dest {
                                planned.push((origin, dest, Relation::TradesWith));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let mut added = 0;
        for (source, target, relation) in planned {
            if self.has_active_edge(source, target, relation) {
                continue;
            }
            self.add_edge(source, target, relation, 1.0, None)?;
            added += 1;
        }
        if added > 0 {
            debug!(added, version = self.version, "derived relations materialized");
        }
        Ok(added)
    }

    // ------------------------------------------------------------ traversal

    /// Lazy, restartable iterator over active adjacent node ids, filtered by
    /// relation and direction. Retired nodes and edges are skipped.
    pub fn neighbors(
        &self,
        id: NodeId,
        relation: Option<Relation>,
        direction: Direction,
    ) -> GraphResult<Neighbors<'_>> {
        if self.nodes.get(id.index()).is_none() {
            return Err(GraphError::NodeNotFound(id));
        }
        Ok(Neighbors::new(
            &self.nodes,
            &self.edges,
            &self.outgoing[id.index()],
            &self.incoming[id.index()],
            relation,
            direction,
        ))
    }

    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|eid| &self.edges[eid.index()])
    }

    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.incoming
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|eid| &self.edges[eid.index()])
    }

    // ---------------------------------------------------------------- scans

    pub fn all_nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn all_edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn active_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    pub fn active_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_active()).count()
    }

    /// Active nodes of one kind, in id order (deterministic).
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&Node> {
        let mut ids: Vec<NodeId> = self
            .kind_index
            .get(&kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.iter()
            .map(|id| &self.nodes[id.index()])
            .filter(|n| n.is_active())
            .collect()
    }

    /// Rebuild a store from persisted node and edge arenas. Indexes are
    /// derived, not stored, so a loaded graph is structurally identical to
    /// the one that was saved.
    pub fn from_parts(version: u64, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut key_index = FxHashMap::default();
        let mut kind_index: FxHashMap<NodeKind, FxHashSet<NodeId>> = FxHashMap::default();
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];

        for node in &nodes {
            key_index.insert(node.key.clone(), node.id);
            kind_index.entry(node.kind).or_default().insert(node.id);
        }
        for edge in &edges {
            outgoing[edge.source.index()].push(edge.id);
            incoming[edge.target.index()].push(edge.id);
        }

        GraphStore {
            nodes,
            edges,
            key_index,
            outgoing,
            incoming,
            kind_index,
            version,
        }
    }

    // ------------------------------------------------------------- snapshot

    /// Immutable view pinned to the current version. Readers (embedding,
    /// simulation, scoring) never observe a graph mutating mid-computation.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(
            self.version,
            Arc::new(self.nodes.clone()),
            Arc::new(self.edges.clone()),
            Arc::new(self.outgoing.clone()),
            Arc::new(self.incoming.clone()),
            Arc::new(self.key_index.clone()),
        )
    }
}

/// Restartable neighbor iterator. Outgoing edges yield targets, incoming
/// yield sources; `Both` chains the two.
#[derive(Clone)]
pub struct Neighbors<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
    outgoing: &'a [EdgeId],
    incoming: &'a [EdgeId],
    relation: Option<Relation>,
    direction: Direction,
    out_pos: usize,
    in_pos: usize,
}

impl<'a> Neighbors<'a> {
    fn new(
        nodes: &'a [Node],
        edges: &'a [Edge],
        outgoing: &'a [EdgeId],
        incoming: &'a [EdgeId],
        relation: Option<Relation>,
        direction: Direction,
    ) -> Self {
        Neighbors {
            nodes,
            edges,
            outgoing,
            incoming,
            relation,
            direction,
            out_pos: 0,
            in_pos: 0,
        }
    }

    fn admits(&self, edge: &Edge, other: NodeId) -> bool {
        edge.is_active()
            && self.relation.map_or(true, |r| edge.relation == r)
            && self.nodes[other.index()].is_active()
    }
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if matches!(self.direction, Direction::Outgoing | Direction::Both) {
            while self.out_pos < self.outgoing.len() {
                let edge = &self.edges[self.outgoing[self.out_pos].index()];
                self.out_pos += 1;
                if self.admits(edge, edge.target) {
                    return Some(edge.target);
                }
            }
        }
        if matches!(self.direction, Direction::Incoming | Direction::Both) {
            while self.in_pos < self.incoming.len() {
                let edge = &self.edges[self.incoming[self.in_pos].index()];
                self.in_pos += 1;
                if self.admits(edge, edge.source) {
                    return Some(edge.source);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attr::AttrMap;

    fn store_with_pair() -> (GraphStore, NodeId, NodeId) {
        let mut store = GraphStore::new();
        let s = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let c = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        (store, s, c)
    }

    #[test]
    fn test_add_node_bumps_version() {
        let mut store = GraphStore::new();
        let v0 = store.version();
        store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        assert_eq!(store.version(), v0 + 1);
    }

    #[test]
    fn test_duplicate_key_rejected_version_unchanged() {
        let mut store = GraphStore::new();
        store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let v = store.version();
        let err = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateId("SUP_0001".to_string()));
        assert_eq!(store.version(), v);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let (mut store, s, _) = store_with_pair();
        let v = store.version();
        let err = store
            .add_edge(s, NodeId::new(99), Relation::Supplies, 0.5, None)
            .unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(NodeId::new(99)));
        assert_eq!(store.version(), v);
    }

    #[test]
    fn test_endpoint_kinds_enforced() {
        let (mut store, s, c) = store_with_pair();
        // Supplies goes supplier -> component, not the reverse
        assert!(store.add_edge(c, s, Relation::Supplies, 0.5, None).is_err());
        assert!(store.add_edge(s, c, Relation::Supplies, 0.5, None).is_ok());
    }

    #[test]
    fn test_capacity_invariant() {
        let mut store = GraphStore::new();
        let s = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let c1 = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        let c2 = store
            .add_node(NodeKind::Component, "COMP_0002", AttrMap::new())
            .unwrap();

        store.add_edge(s, c1, Relation::Supplies, 0.7, None).unwrap();
        let v = store.version();

        // 0.7 + 0.5 = 1.2 > 1.0: rejected, version unchanged
        let err = store
            .add_edge(s, c2, Relation::Supplies, 0.5, None)
            .unwrap_err();
        assert!(matches!(err, GraphError::CapacityExceeded { .. }));
        assert_eq!(store.version(), v);

        // exactly filling capacity is accepted
        store.add_edge(s, c2, Relation::Supplies, 0.3, None).unwrap();
        assert!(store.outgoing_load(s, Relation::Supplies) <= 1.0 + CAPACITY_EPSILON);
    }

    #[test]
    fn test_capacity_frees_on_retirement() {
        let mut store = GraphStore::new();
        let s = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let c = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        let e = store.add_edge(s, c, Relation::Supplies, 0.9, None).unwrap();
        store.retire_edge(e).unwrap();
        // retired weight no longer counts against capacity
        assert!(store.add_edge(s, c, Relation::Supplies, 0.8, None).is_ok());
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let (mut store, s, c) = store_with_pair();
        assert!(matches!(
            store.add_edge(s, c, Relation::Supplies, 1.5, None),
            Err(GraphError::InvalidWeight(_))
        ));
        assert!(matches!(
            store.add_edge(s, c, Relation::Supplies, -0.1, None),
            Err(GraphError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_update_attrs_validated_atomically() {
        let (mut store, s, _) = store_with_pair();
        let v = store.version();

        let mut bad = AttrMap::new();
        bad.insert("quality_score".to_string(), 0.9.into());
        bad.insert("bogus_field".to_string(), 1i64.into());
        assert!(store.update_attrs(s, bad).is_err());
        // nothing applied, version unchanged
        assert_eq!(store.version(), v);
        assert!(!store.get_node(s).unwrap().has_attr("quality_score"));

        let mut good = AttrMap::new();
        good.insert("quality_score".to_string(), 0.9.into());
        store.update_attrs(s, good).unwrap();
        assert_eq!(store.version(), v + 1);
    }

    #[test]
    fn test_retire_node_cascades_to_edges() {
        let (mut store, s, c) = store_with_pair();
        let e = store.add_edge(s, c, Relation::Supplies, 0.5, None).unwrap();
        let v = store.version();

        store.retire_node(s).unwrap();
        assert_eq!(store.version(), v + 1);
        assert!(!store.get_node(s).unwrap().is_active());
        assert!(!store.get_edge(e).unwrap().is_active());
        // still queryable as history
        assert_eq!(store.get_node(s).unwrap().key, "SUP_0001");

        // retired node excluded from traversal
        let n: Vec<_> = store.neighbors(c, None, Direction::Both).unwrap().collect();
        assert!(n.is_empty());
    }

    #[test]
    fn test_neighbors_filtering_and_restart() {
        let mut store = GraphStore::new();
        let s = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let c1 = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        let c2 = store
            .add_node(NodeKind::Component, "COMP_0002", AttrMap::new())
            .unwrap();
        let country = store
            .add_node(NodeKind::Country, "DE", AttrMap::new())
            .unwrap();

        store.add_edge(s, c1, Relation::Supplies, 0.4, None).unwrap();
        store.add_edge(s, c2, Relation::Supplies, 0.4, None).unwrap();
        store.add_edge(s, country, Relation::LocatedIn, 1.0, None).unwrap();

        let supplies: Vec<_> = store
            .neighbors(s, Some(Relation::Supplies), Direction::Outgoing)
            .unwrap()
            .collect();
        assert_eq!(supplies, vec![c1, c2]);

        let all: Vec<_> = store.neighbors(s, None, Direction::Both).unwrap().collect();
        assert_eq!(all.len(), 3);

        // restartable: cloning the iterator replays it
        let iter = store.neighbors(s, None, Direction::Outgoing).unwrap();
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);

        // incoming direction finds the supplier from a component
        let inbound: Vec<_> = store
            .neighbors(c1, Some(Relation::Supplies), Direction::Incoming)
            .unwrap()
            .collect();
        assert_eq!(inbound, vec![s]);
    }

    #[test]
    fn test_derive_relations() {
        let mut store = GraphStore::new();
        let s1 = store
            .add_node(NodeKind::Supplier, "SUP_0001", AttrMap::new())
            .unwrap();
        let s2 = store
            .add_node(NodeKind::Supplier, "SUP_0002", AttrMap::new())
            .unwrap();
        let c = store
            .add_node(NodeKind::Component, "COMP_0001", AttrMap::new())
            .unwrap();
        let vn = store
            .add_node(NodeKind::Country, "VN", AttrMap::new())
            .unwrap();
        let de = store
            .add_node(NodeKind::Country, "DE", AttrMap::new())
            .unwrap();
        let r = store
            .add_node(NodeKind::Route, "RT_0001", AttrMap::new())
            .unwrap();
        store.add_edge(s1, c, Relation::Supplies, 0.6, None).unwrap();
        store.add_edge(s2, c, Relation::Supplies, 0.4, None).unwrap();
        store.add_edge(r, vn, Relation::OriginatesIn, 1.0, None).unwrap();
        store.add_edge(r, de, Relation::DeliversTo, 1.0, None).unwrap();

        // two co_supplier directions plus one trades_with
        assert_eq!(store.derive_relations().unwrap(), 3);
        let co: Vec<_> = store
            .neighbors(s1, Some(Relation::CoSupplier), Direction::Outgoing)
            .unwrap()
            .collect();
        assert_eq!(co, vec![s2]);
        let trades: Vec<_> = store
            .neighbors(vn, Some(Relation::TradesWith), Direction::Outgoing)
            .unwrap()
            .collect();
        assert_eq!(trades, vec![de]);

        // idempotent on a second pass
        assert_eq!(store.derive_relations().unwrap(), 0);
    }

    #[test]
    fn test_update_edge_weight_capacity() {
        let (mut store, s, c) = store_with_pair();
        let e = store.add_edge(s, c, Relation::Supplies, 0.5, None).unwrap();
        // raising within capacity is fine; the old weight is excluded
        store.update_edge_weight(e, 1.0).unwrap();
        assert!(matches!(
            store.update_edge_weight(e, 1.2),
            Err(GraphError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_snapshot_is_pinned() {
        let (mut store, s, c) = store_with_pair();
        store.add_edge(s, c, Relation::Supplies, 0.5, None).unwrap();
        let snap = store.snapshot();
        let pinned = snap.version;

        store
            .add_node(NodeKind::Country, "DE", AttrMap::new())
            .unwrap();
        assert_eq!(snap.version, pinned);
        assert!(store.version() > pinned);
        assert_eq!(snap.active_nodes().count(), 2);
    }

    #[test]
    fn test_nodes_of_kind_ordering() {
        let mut store = GraphStore::new();
        for i in 0..5 {
            store
                .add_node(NodeKind::Supplier, format!("SUP_{i:04}"), AttrMap::new())
                .unwrap();
        }
        let ids: Vec<_> = store.nodes_of_kind(NodeKind::Supplier).iter().map(|n| n.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}

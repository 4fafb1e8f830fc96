//! Core type definitions for the supplier knowledge graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique internal identifier for a node (dense arena index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Unique internal identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(id: u64) -> Self {
        EdgeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        EdgeId(id)
    }
}

/// Entity kind of a node. The set of valid attributes is fixed per kind
/// (see [`crate::graph::schema`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum NodeKind {
    Supplier,
    Component,
    Country,
    Contract,
    Route,
}

impl NodeKind {
    /// All kinds in canonical order. Per-kind tables (feature specs, input
    /// projections) are indexed by position in this slice, so iteration
    /// always goes through it rather than a hash map.
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Supplier,
        NodeKind::Component,
        NodeKind::Country,
        NodeKind::Contract,
        NodeKind::Route,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Supplier => "supplier",
            NodeKind::Component => "component",
            NodeKind::Country => "country",
            NodeKind::Contract => "contract",
            NodeKind::Route => "route",
        }
    }

    /// Canonical ordinal, used to index per-kind tables.
    pub fn ordinal(&self) -> usize {
        match self {
            NodeKind::Supplier => 0,
            NodeKind::Component => 1,
            NodeKind::Country => 2,
            NodeKind::Contract => 3,
            NodeKind::Route => 4,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relation kind of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Relation {
    /// Supplier -> Component dependency fraction. Capacity constrained:
    /// active outgoing weights from one node must sum to <= 1.
    Supplies,
    /// Supplier -> Country
    LocatedIn,
    /// Contract -> Component
    Covers,
    /// Contract -> Supplier
    SignedWith,
    /// Supplier -> Contract
    GovernedBy,
    /// Route -> Country (origin)
    OriginatesIn,
    /// Route -> Country (destination)
    DeliversTo,
    /// Route -> Component
    Carries,
    /// Component -> Route
    RoutesThrough,
    /// Supplier <-> Supplier sharing a component (derived)
    CoSupplier,
    /// Country <-> Country linked by a route (derived)
    TradesWith,
}

impl Relation {
    /// All relations in canonical order. Per-relation aggregator parameters
    /// are indexed by position in this slice.
    pub const ALL: [Relation; 11] = [
        Relation::Supplies,
        Relation::LocatedIn,
        Relation::Covers,
        Relation::SignedWith,
        Relation::GovernedBy,
        Relation::OriginatesIn,
        Relation::DeliversTo,
        Relation::Carries,
        Relation::RoutesThrough,
        Relation::CoSupplier,
        Relation::TradesWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Supplies => "SUPPLIES",
            Relation::LocatedIn => "LOCATED_IN",
            Relation::Covers => "COVERS",
            Relation::SignedWith => "SIGNED_WITH",
            Relation::GovernedBy => "GOVERNED_BY",
            Relation::OriginatesIn => "ORIGINATES_IN",
            Relation::DeliversTo => "DELIVERS_TO",
            Relation::Carries => "CARRIES",
            Relation::RoutesThrough => "ROUTES_THROUGH",
            Relation::CoSupplier => "CO_SUPPLIER",
            Relation::TradesWith => "TRADES_WITH",
        }
    }

    pub fn ordinal(&self) -> usize {
        match self {
            Relation::Supplies => 0,
            Relation::LocatedIn => 1,
            Relation::Covers => 2,
            Relation::SignedWith => 3,
            Relation::GovernedBy => 4,
            Relation::OriginatesIn => 5,
            Relation::DeliversTo => 6,
            Relation::Carries => 7,
            Relation::RoutesThrough => 8,
            Relation::CoSupplier => 9,
            Relation::TradesWith => 10,
        }
    }

    /// Whether outgoing weights of this relation are dependency fractions
    /// subject to the sum <= 1 capacity invariant.
    pub fn is_capacity_constrained(&self) -> bool {
        matches!(self, Relation::Supplies)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Traversal direction for neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

/// Optional temporal validity window for an edge (Unix milliseconds,
/// half-open: active while `from <= t < until`). `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Validity {
    pub from: Option<i64>,
    pub until: Option<i64>,
}

impl Validity {
    pub fn new(from: Option<i64>, until: Option<i64>) -> Self {
        Validity { from, until }
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.from.map_or(true, |f| ts >= f) && self.until.map_or(true, |u| ts < u)
    }
}

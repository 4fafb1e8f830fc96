//! Heterogeneous supply-network graph: typed nodes, weighted relations,
//! versioned mutation, and immutable snapshots for readers.

pub mod attr;
pub mod edge;
pub mod node;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod view;

pub use attr::{AttrMap, AttrValue};
pub use edge::Edge;
pub use node::Node;
pub use schema::SchemaViolation;
pub use snapshot::{GraphSnapshot, GraphStats};
pub use store::{GraphError, GraphResult, GraphStore, Neighbors, CAPACITY_EPSILON};
pub use types::{Direction, EdgeId, NodeId, NodeKind, Relation, Validity};
pub use view::{DenseView, Message, ViewFilter, NUM_CHANNELS, NUM_RELATIONS};

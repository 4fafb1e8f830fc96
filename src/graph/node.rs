//! Node implementation for the supplier knowledge graph

use super::attr::{AttrMap, AttrValue};
use super::types::{NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// A typed node in the knowledge graph.
///
/// Nodes carry:
/// - an immutable caller-supplied key (`SUP_0001` style) and dense internal id
/// - a kind tag with a fixed attribute schema
/// - schema-validated attributes
/// - creation/update timestamps and a soft-retirement marker
///
/// Cached embeddings live in the versioned embedding cache, not on the node,
/// so cache invalidation stays a single scoped operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Dense internal identifier
    pub id: NodeId,

    /// Caller-supplied external key, unique and immutable
    pub key: String,

    /// Entity kind
    pub kind: NodeKind,

    /// Graph version at which this node was last written
    pub version: u64,

    /// Schema-validated attributes
    pub attrs: AttrMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,

    /// Soft-delete marker: set when the node is retired. Retired nodes stay
    /// queryable as history but are excluded from active traversal.
    pub retired_at: Option<i64>,
}

impl Node {
    pub fn new(id: NodeId, key: impl Into<String>, kind: NodeKind, attrs: AttrMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Node {
            id,
            key: key.into(),
            kind,
            version: 1,
            attrs,
            created_at: now,
            updated_at: now,
            retired_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.retired_at.is_none()
    }

    pub fn retire(&mut self) {
        if self.retired_at.is_none() {
            let now = chrono::Utc::now().timestamp_millis();
            self.retired_at = Some(now);
            self.updated_at = now;
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Set an attribute value. Callers go through
    /// [`super::store::GraphStore::update_attrs`] so the value has already
    /// passed schema validation.
    pub(crate) fn set_attr(&mut self, key: impl Into<String>, value: AttrValue) -> Option<AttrValue> {
        let old = self.attrs.insert(key.into(), value);
        self.updated_at = chrono::Utc::now().timestamp_millis();
        old
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }

    /// Display label: the `name` attribute if present, otherwise the key.
    pub fn display_name(&self) -> &str {
        self.attrs
            .get("name")
            .and_then(|v| v.as_text())
            .unwrap_or(&self.key)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

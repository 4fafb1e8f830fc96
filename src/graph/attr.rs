//! Attribute value types for graph nodes
//!
//! The schema per node kind is fixed (see [`super::schema`]); attribute
//! values themselves are limited to the scalar and categorical types the
//! feature encoder knows how to turn into numbers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar or categorical attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Continuous numeric field (prices, scores, distances)
    Float(f64),
    /// Discrete numeric field (counts, day spans)
    Int(i64),
    /// Categorical field (category, transport mode, criticality tier)
    Text(String),
    /// Boolean flag (is_primary, is_active)
    Flag(bool),
    /// Unix-millisecond timestamp (contract start/end)
    Timestamp(i64),
}

impl AttrValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            AttrValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Numeric view used by the feature encoder: floats and ints as-is,
    /// flags as 0/1. Text and timestamps have no direct numeric view.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttrValue::Text(_) | AttrValue::Timestamp(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Float(_) => "Float",
            AttrValue::Int(_) => "Int",
            AttrValue::Text(_) => "Text",
            AttrValue::Flag(_) => "Flag",
            AttrValue::Timestamp(_) => "Timestamp",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Text(v) => write!(f, "\"{}\"", v),
            AttrValue::Flag(v) => write!(f, "{}", v),
            AttrValue::Timestamp(v) => write!(f, "Timestamp({})", v),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Flag(v)
    }
}

/// Attribute map. Insertion-ordered so feature encoding and serialization
/// are deterministic across runs.
pub type AttrMap = IndexMap<String, AttrValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_value_accessors() {
        assert_eq!(AttrValue::Float(3.5).as_float(), Some(3.5));
        assert_eq!(AttrValue::Int(7).as_int(), Some(7));
        assert_eq!(AttrValue::Text("Ocean".into()).as_text(), Some("Ocean"));
        assert_eq!(AttrValue::Flag(true).as_flag(), Some(true));
        assert_eq!(AttrValue::Timestamp(1_700_000_000_000).as_timestamp(), Some(1_700_000_000_000));

        assert_eq!(AttrValue::Int(7).as_float(), None);
        assert_eq!(AttrValue::Text("x".into()).as_numeric(), None);
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(AttrValue::Float(0.25).as_numeric(), Some(0.25));
        assert_eq!(AttrValue::Int(-3).as_numeric(), Some(-3.0));
        assert_eq!(AttrValue::Flag(true).as_numeric(), Some(1.0));
        assert_eq!(AttrValue::Flag(false).as_numeric(), Some(0.0));
    }

    #[test]
    fn test_conversions() {
        let v: AttrValue = 0.93.into();
        assert_eq!(v.type_name(), "Float");
        let v: AttrValue = 12i64.into();
        assert_eq!(v.type_name(), "Int");
        let v: AttrValue = "Electronics".into();
        assert_eq!(v.type_name(), "Text");
        let v: AttrValue = false.into();
        assert_eq!(v.type_name(), "Flag");
    }

    #[test]
    fn test_attr_map_preserves_insertion_order() {
        let mut attrs = AttrMap::new();
        attrs.insert("reliability_score".to_string(), 0.9.into());
        attrs.insert("lead_time_days".to_string(), 21i64.into());
        attrs.insert("category".to_string(), "Chemicals".into());

        let keys: Vec<&str> = attrs.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["reliability_score", "lead_time_days", "category"]);
    }
}

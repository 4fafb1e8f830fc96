//! Deterministic attribute encoding
//!
//! Turns a node's typed attributes into a raw feature vector: numeric
//! fields in schema order, min-max scaled over the active same-kind
//! population, followed by a small deterministic lookup encoding per
//! categorical field. No randomness anywhere, so the same snapshot always
//! encodes to the same features.

use crate::graph::schema::{self, encode_criticality};
use crate::graph::view::DenseView;
use crate::graph::{GraphSnapshot, Node, NodeKind};

/// Values contributed per categorical field by the lookup encoding.
pub const CAT_DIM: usize = 4;

/// Raw feature length for a kind: numerics + criticality (components) +
/// lookup block per categorical field.
pub fn feature_len(kind: NodeKind) -> usize {
    let numeric = schema::numeric_fields(kind).len();
    let categorical = schema::categorical_fields(kind).len() * CAT_DIM;
    let extra = if kind == NodeKind::Component { 1 } else { 0 };
    numeric + extra + categorical
}

/// splitmix64, the standard seed-scrambler. Used as a tiny deterministic
/// lookup table for categorical values.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

fn hash_str(s: &str) -> u64 {
    // FNV-1a fold, then scramble
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    splitmix64(h)
}

/// Lookup encoding of a categorical value: CAT_DIM values in [-1, 1]
/// derived from the value's hash. An absent field encodes to zeros.
fn encode_categorical(value: Option<&str>, out: &mut Vec<f32>) {
    match value {
        Some(s) => {
            let mut h = hash_str(s);
            for _ in 0..CAT_DIM {
                h = splitmix64(h);
                // top 24 bits -> [-1, 1]
                let unit = (h >> 40) as f32 / (1u64 << 24) as f32;
                out.push(unit * 2.0 - 1.0);
            }
        }
        None => out.extend(std::iter::repeat(0.0).take(CAT_DIM)),
    }
}

/// Raw (unscaled) numeric part of a node's features.
fn raw_numerics(node: &Node) -> Vec<f64> {
    let mut out: Vec<f64> = schema::numeric_fields(node.kind)
        .iter()
        .map(|field| {
            node.get_attr(field)
                .and_then(|v| v.as_numeric())
                .unwrap_or(0.0)
        })
        .collect();
    if node.kind == NodeKind::Component {
        let tier = node
            .get_attr("criticality")
            .and_then(|v| v.as_text())
            .unwrap_or("Low");
        out.push(encode_criticality(tier));
    }
    out
}

/// Encode every node in a dense view. Result is indexed by dense index;
/// each vector has `feature_len(kind)` entries for that node's kind.
pub fn encode_all(snapshot: &GraphSnapshot, view: &DenseView) -> Vec<Vec<f32>> {
    // Per-kind min/max over the projected population, for scaling
    let mut mins: Vec<Vec<f64>> = Vec::with_capacity(NodeKind::ALL.len());
    let mut maxs: Vec<Vec<f64>> = Vec::with_capacity(NodeKind::ALL.len());
    for kind in NodeKind::ALL {
        let width = raw_width(kind);
        mins.push(vec![f64::INFINITY; width]);
        maxs.push(vec![f64::NEG_INFINITY; width]);
    }
    let mut raw: Vec<Vec<f64>> = Vec::with_capacity(view.node_count);
    for id in &view.index_to_node {
        let node = snapshot
            .node(*id)
            .expect("view node ids are drawn from the snapshot");
        let values = raw_numerics(node);
        let k = node.kind.ordinal();
        for (j, v) in values.iter().enumerate() {
            if *v < mins[k][j] {
                mins[k][j] = *v;
            }
            if *v > maxs[k][j] {
                maxs[k][j] = *v;
            }
        }
        raw.push(values);
    }

    let mut features = Vec::with_capacity(view.node_count);
    for (idx, id) in view.index_to_node.iter().enumerate() {
        let node = snapshot.node(*id).expect("checked above");
        let k = node.kind.ordinal();
        let mut out: Vec<f32> = Vec::with_capacity(feature_len(node.kind));
        for (j, v) in raw[idx].iter().enumerate() {
            let range = maxs[k][j] - mins[k][j];
            let scaled = if range > 0.0 {
                (v - mins[k][j]) / range
            } else {
                // constant column over the population
                0.0
            };
            out.push(scaled as f32);
        }
        for field in schema::categorical_fields(node.kind) {
            encode_categorical(node.get_attr(field).and_then(|v| v.as_text()), &mut out);
        }
        debug_assert_eq!(out.len(), feature_len(node.kind));
        features.push(out);
    }
    features
}

fn raw_width(kind: NodeKind) -> usize {
    schema::numeric_fields(kind).len() + if kind == NodeKind::Component { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::view::ViewFilter;
    use crate::graph::{AttrMap, GraphStore};

    fn suppliers(scores: &[f64]) -> GraphStore {
        let mut store = GraphStore::new();
        for (i, s) in scores.iter().enumerate() {
            let mut attrs = AttrMap::new();
            attrs.insert("reliability_score".to_string(), (*s).into());
            attrs.insert("category".to_string(), "Chemicals".into());
            store
                .add_node(NodeKind::Supplier, format!("SUP_{i:04}"), attrs)
                .unwrap();
        }
        store
    }

    #[test]
    fn test_minmax_scaling() {
        let store = suppliers(&[0.2, 0.5, 0.8]);
        let snap = store.snapshot();
        let view = DenseView::build(&snap, &ViewFilter::default());
        let feats = encode_all(&snap, &view);

        // reliability_score is the first numeric field for suppliers
        assert_eq!(feats[0][0], 0.0);
        assert!((feats[1][0] - 0.5).abs() < 1e-6);
        assert_eq!(feats[2][0], 1.0);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let store = suppliers(&[0.7, 0.7]);
        let snap = store.snapshot();
        let view = DenseView::build(&snap, &ViewFilter::default());
        let feats = encode_all(&snap, &view);
        assert_eq!(feats[0][0], 0.0);
        assert_eq!(feats[1][0], 0.0);
    }

    #[test]
    fn test_categorical_encoding_deterministic_and_distinct() {
        let mut a = Vec::new();
        encode_categorical(Some("Ocean"), &mut a);
        let mut b = Vec::new();
        encode_categorical(Some("Ocean"), &mut b);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));

        let mut c = Vec::new();
        encode_categorical(Some("Air"), &mut c);
        assert_ne!(a, c);

        let mut none = Vec::new();
        encode_categorical(None, &mut none);
        assert_eq!(none, vec![0.0; CAT_DIM]);
    }

    #[test]
    fn test_component_criticality_contributes() {
        let mut store = GraphStore::new();
        let mut low = AttrMap::new();
        low.insert("criticality".to_string(), "Low".into());
        let mut critical = AttrMap::new();
        critical.insert("criticality".to_string(), "Critical".into());
        store.add_node(NodeKind::Component, "COMP_L", low).unwrap();
        store
            .add_node(NodeKind::Component, "COMP_C", critical)
            .unwrap();

        let snap = store.snapshot();
        let view = DenseView::build(&snap, &ViewFilter::default());
        let feats = encode_all(&snap, &view);
        let slot = schema::numeric_fields(NodeKind::Component).len();
        assert_eq!(feats[0][slot], 0.0);
        assert_eq!(feats[1][slot], 1.0);
    }

    #[test]
    fn test_feature_lengths() {
        for kind in NodeKind::ALL {
            assert!(feature_len(kind) > 0);
        }
        let store = suppliers(&[0.5]);
        let snap = store.snapshot();
        let view = DenseView::build(&snap, &ViewFilter::default());
        let feats = encode_all(&snap, &view);
        assert_eq!(feats[0].len(), feature_len(NodeKind::Supplier));
    }
}

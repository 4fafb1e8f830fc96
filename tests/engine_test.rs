//! End-to-end engine tests
//!
//! Exercises the full loop on a small but realistic supply network:
//! build, embed, score, simulate, fold feedback back in, persist, reload.

use supplygraph::config::EngineConfig;
use supplygraph::embed::{EmbedError, Scope};
use supplygraph::feedback::DecisionOutcome;
use supplygraph::graph::{AttrMap, AttrValue, GraphError, NodeKind, Relation};
use supplygraph::persistence::SnapshotStore;
use supplygraph::propagate::GraphOverlay;
use supplygraph::{EngineError, SupplyGraphEngine};
use tempfile::TempDir;

fn attrs(pairs: &[(&str, AttrValue)]) -> AttrMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn supplier(spend: f64, reliability: f64) -> AttrMap {
    attrs(&[
        ("annual_spend_usd", AttrValue::Float(spend)),
        ("reliability_score", AttrValue::Float(reliability)),
    ])
}

fn test_config() -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.embedding.dim = 16;
    cfg
}

/// Four suppliers feeding one component, a contract, a country and a
/// route around them.
fn build_network(engine: &SupplyGraphEngine) {
    engine
        .add_node(
            NodeKind::Component,
            "COMP_0001",
            attrs(&[
                ("unit_cost_usd", AttrValue::Float(12.5)),
                ("criticality", AttrValue::Text("High".to_string())),
            ]),
        )
        .unwrap();
    for (key, spend, rel, share) in [
        ("SUP_0001", 1_000_000.0, 0.95, 0.4),
        ("SUP_0002", 950_000.0, 0.91, 0.3),
        ("SUP_0003", 1_020_000.0, 0.93, 0.2),
        ("SUP_0004", 980_000.0, 0.90, 0.1),
    ] {
        engine
            .add_node(NodeKind::Supplier, key, supplier(spend, rel))
            .unwrap();
        engine
            .add_edge(key, "COMP_0001", Relation::Supplies, share, None)
            .unwrap();
    }
    engine
        .add_node(
            NodeKind::Country,
            "VN",
            attrs(&[("geopolitical_risk", AttrValue::Float(0.3))]),
        )
        .unwrap();
    engine
        .add_edge("SUP_0001", "VN", Relation::LocatedIn, 1.0, None)
        .unwrap();
    engine
        .add_node(
            NodeKind::Contract,
            "CTR_0001",
            attrs(&[("value_usd", AttrValue::Float(500_000.0))]),
        )
        .unwrap();
    engine
        .add_edge("CTR_0001", "COMP_0001", Relation::Covers, 0.9, None)
        .unwrap();
    engine
        .add_node(
            NodeKind::Route,
            "RT_0001",
            attrs(&[("transit_days", AttrValue::Float(21.0))]),
        )
        .unwrap();
    engine
        .add_edge("COMP_0001", "RT_0001", Relation::RoutesThrough, 0.8, None)
        .unwrap();
}

#[test]
fn test_capacity_invariant_through_facade() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    let before = engine.version();

    // SUP_0001 already supplies 0.4 of the component; pushing its total
    // over 1.0 must bounce without a version bump
    engine
        .add_node(NodeKind::Component, "COMP_0002", AttrMap::new())
        .unwrap();
    let version_after_node = engine.version();
    let err = engine
        .add_edge("SUP_0001", "COMP_0002", Relation::Supplies, 0.7, None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Graph(GraphError::CapacityExceeded { .. })
    ));
    assert_eq!(engine.version(), version_after_node);
    assert!(version_after_node > before);

    // a fitting share still goes through
    engine
        .add_edge("SUP_0001", "COMP_0002", Relation::Supplies, 0.6, None)
        .unwrap();
}

#[test]
fn test_embeddings_deterministic_across_engines() {
    let a = SupplyGraphEngine::new(test_config()).unwrap();
    let b = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&a);
    build_network(&b);
    a.refresh_embeddings(Scope::Full).unwrap();
    b.refresh_embeddings(Scope::Full).unwrap();

    for key in ["SUP_0001", "SUP_0003", "COMP_0001", "VN", "RT_0001"] {
        let va = a.get_embedding(key).unwrap();
        let vb = b.get_embedding(key).unwrap();
        assert_eq!(va, vb, "vectors diverge for {key}");
        let norm: f32 = va.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_stale_read_then_incremental_refresh() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    engine.refresh_embeddings(Scope::Full).unwrap();
    engine.get_embedding("SUP_0002").unwrap();

    engine
        .update_attrs(
            "SUP_0002",
            attrs(&[("reliability_score", AttrValue::Float(0.2))]),
        )
        .unwrap();
    assert!(matches!(
        engine.get_embedding("SUP_0002").unwrap_err(),
        EngineError::Embedding(EmbedError::Stale { .. })
    ));

    let touched = engine.snapshot().node_id("SUP_0002").unwrap();
    engine
        .refresh_embeddings(Scope::Around {
            nodes: vec![touched],
            hops: 2,
        })
        .unwrap();
    engine.get_embedding("SUP_0002").unwrap();
    // untouched nodes are readable at the new version too
    engine.get_embedding("CTR_0001").unwrap();
}

#[test]
fn test_anomaly_scan_and_low_confidence() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    engine.refresh_embeddings(Scope::Full).unwrap();

    let verdicts = engine.get_anomalies(NodeKind::Supplier).unwrap();
    assert_eq!(verdicts.len(), 4);
    // four suppliers share the component, so everyone has three peers
    assert!(verdicts.iter().all(|v| v.as_scored().is_some()));

    // an outlandish price observation scores above a typical one
    let outlier = engine
        .score_price("SUP_0001", 50_000_000.0, Some(1_756_000_000_000))
        .unwrap();
    let typical = engine.score_price("SUP_0001", 1_000_000.0, None).unwrap();
    assert!(
        outlier.as_scored().unwrap().combined > typical.as_scored().unwrap().combined
    );

    // retire two suppliers and the group drops below the minimum
    engine.retire_node("SUP_0003").unwrap();
    engine.retire_node("SUP_0004").unwrap();
    engine.refresh_embeddings(Scope::Full).unwrap();
    let verdicts = engine.get_anomalies(NodeKind::Supplier).unwrap();
    assert_eq!(verdicts.len(), 2);
    assert!(verdicts
        .iter()
        .all(|v| matches!(v, supplygraph::Verdict::LowConfidence { peers_found: 1, .. })));
}

#[test]
fn test_derive_relations_through_facade() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);

    // four suppliers share the component: 6 pairs, both directions
    assert_eq!(engine.derive_relations().unwrap(), 12);
    assert_eq!(engine.derive_relations().unwrap(), 0);

    let snap = engine.snapshot();
    let s1 = snap.node_id("SUP_0001").unwrap();
    let peers = snap
        .neighbors(s1, Some(Relation::CoSupplier), supplygraph::graph::Direction::Outgoing)
        .count();
    assert_eq!(peers, 3);
}

#[test]
fn test_disruption_two_hops_and_counterfactual() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    let snap = engine.snapshot();
    let comp = snap.node_id("COMP_0001").unwrap();
    let route = snap.node_id("RT_0001").unwrap();

    let report = engine.simulate_disruption("SUP_0001", 1.0, None).unwrap();
    assert!(report.converged);
    assert!(report.steps_run <= 5);
    // hop 1: 1.0 * 0.4 share * 0.5 decay; hop 2 continues over the route
    assert!((report.impact_of(comp).unwrap() - 0.2).abs() < 1e-9);
    assert!((report.impact_of(route).unwrap() - 0.08).abs() < 1e-9);
    let comp_entry = report.impacts.iter().find(|e| e.node == comp).unwrap();
    assert_eq!(comp_entry.first_affected_step, 1);

    // counterfactual: the component already resourced away from SUP_0001
    let overlay =
        GraphOverlay::new().remove_edge("SUP_0001", "COMP_0001", Relation::Supplies);
    let report = engine
        .simulate_disruption("SUP_0001", 1.0, Some(&overlay))
        .unwrap();
    assert!(report.impact_of(comp).is_none());

    // the overlay never touched the live graph
    assert_eq!(engine.snapshot().version, snap.version);
}

#[test]
fn test_feedback_switch_updates_graph_and_embeddings() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    engine.refresh_embeddings(Scope::Full).unwrap();
    let before = engine.version();

    let receipt = engine
        .record_decision_outcome(&DecisionOutcome::SupplierSwitch {
            component: "COMP_0001".to_string(),
            from_supplier: "SUP_0004".to_string(),
            to_supplier: "SUP_0002".to_string(),
            weight: 0.1,
            cost_delta_usd: -0.5,
        })
        .unwrap();
    assert!(receipt.version > before);
    assert!(receipt.invalidated > 0);

    // embeddings were refreshed around the touched region inline
    engine.get_embedding("SUP_0002").unwrap();
    engine.get_embedding("COMP_0001").unwrap();

    let snap = engine.snapshot();
    let comp = snap.node_by_key("COMP_0001").unwrap();
    assert_eq!(
        comp.get_attr("unit_cost_usd").and_then(|v| v.as_numeric()),
        Some(12.0)
    );
    // SUP_0004 no longer supplies anything
    let lineage = engine.get_lineage("COMP_0001", false).unwrap();
    assert!(lineage.iter().all(|e| e.key != "SUP_0004"));
}

#[test]
fn test_save_and_reload_round_trip() {
    let dir = TempDir::new().unwrap();
    let snaps = SnapshotStore::open(dir.path()).unwrap();

    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    engine.refresh_embeddings(Scope::Full).unwrap();
    let saved_version = engine.version();
    let vector_before = engine.get_embedding("SUP_0001").unwrap();
    engine.save(&snaps).unwrap();

    let restored = SupplyGraphEngine::load(&snaps, test_config()).unwrap();
    assert_eq!(restored.version(), saved_version);
    // cached vectors come back fresh, bit for bit
    assert_eq!(restored.get_embedding("SUP_0001").unwrap(), vector_before);

    // restored graph behaves identically
    let snap = restored.snapshot();
    let comp = snap.node_id("COMP_0001").unwrap();
    let report = restored.simulate_disruption("SUP_0001", 1.0, None).unwrap();
    assert!((report.impact_of(comp).unwrap() - 0.2).abs() < 1e-9);

    let stats = restored.stats();
    assert_eq!(stats.total_nodes, 8);
    assert_eq!(stats.total_edges, 7);
}

#[test]
fn test_retire_excludes_from_everything() {
    let engine = SupplyGraphEngine::new(test_config()).unwrap();
    build_network(&engine);
    engine.retire_node("SUP_0001").unwrap();
    engine.refresh_embeddings(Scope::Full).unwrap();

    // retired nodes get no embedding
    assert!(matches!(
        engine.get_embedding("SUP_0001").unwrap_err(),
        EngineError::Embedding(EmbedError::Missing(_))
    ));
    // and cannot seed a simulation
    assert!(engine.simulate_disruption("SUP_0001", 1.0, None).is_err());
    // and are gone from stats
    assert_eq!(engine.stats().total_nodes, 7);
}

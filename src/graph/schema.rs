//! Fixed attribute schema per node kind and endpoint rules per relation
//!
//! Node attributes were originally free-form dictionaries; here every kind
//! carries a fixed field list validated at construction. The numeric field
//! lists double as the feature order for the embedding encoder, so their
//! order is load-bearing and must not be reshuffled.

use super::attr::{AttrMap, AttrValue};
use super::types::{NodeKind, Relation};
use thiserror::Error;

/// Schema violations detected at node/edge construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    #[error("unknown attribute '{key}' for {kind} node")]
    UnknownAttribute { kind: NodeKind, key: String },

    #[error("attribute '{key}' on {kind} node expects {expected}, got {found}")]
    WrongType {
        kind: NodeKind,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("relation {relation} does not connect {src} -> {target}")]
    BadEndpoints {
        relation: Relation,
        src: NodeKind,
        target: NodeKind,
    },
}

/// Numeric feature fields per kind, in encoding order.
pub fn numeric_fields(kind: NodeKind) -> &'static [&'static str] {
    match kind {
        NodeKind::Supplier => &[
            "reliability_score",
            "annual_spend_usd",
            "on_time_delivery",
            "quality_score",
            "lead_time_days",
            "defect_rate_ppm",
            "financial_risk_score",
            "sustainability_score",
            "years_active",
            "is_sole_source",
            "is_preferred",
            "headcount",
            "revenue_usd_m",
        ],
        NodeKind::Component => &[
            "unit_cost_usd",
            "annual_volume",
            "lead_time_weeks",
            "inventory_days",
            "weight_kg",
            "is_custom",
        ],
        NodeKind::Country => &[
            "geopolitical_risk",
            "avg_tariff_rate",
            "logistics_index",
            "currency_volatility",
            "labor_cost_index",
            "trade_agreements",
        ],
        NodeKind::Contract => &[
            "value_usd",
            "savings_realized_usd",
            "sla_penalty_usd",
            "negotiation_rounds",
            "duration_days",
            "is_active",
            "auto_renew",
            "has_rebate",
        ],
        NodeKind::Route => &[
            "transit_days",
            "cost_per_kg_usd",
            "reliability_score",
            "carbon_kg_per_ton",
            "distance_km",
            "lead_time_days",
            "is_active",
            "customs_delay_days",
        ],
    }
}

/// Categorical (text) fields per kind. Every kind also accepts a free
/// `name` label.
pub fn categorical_fields(kind: NodeKind) -> &'static [&'static str] {
    match kind {
        NodeKind::Supplier => &["category", "risk_tier", "country"],
        NodeKind::Component => &["category", "criticality"],
        NodeKind::Country => &["region"],
        NodeKind::Contract => &["status", "payment_terms"],
        NodeKind::Route => &["transport_mode"],
    }
}

/// Timestamp fields per kind.
pub fn timestamp_fields(kind: NodeKind) -> &'static [&'static str] {
    match kind {
        NodeKind::Contract => &["start_date", "end_date"],
        _ => &[],
    }
}

/// Criticality tier encoding used by the feature encoder.
pub fn encode_criticality(tier: &str) -> f64 {
    match tier {
        "Low" => 0.0,
        "Medium" => 1.0,
        "High" => 2.0,
        "Critical" => 3.0,
        _ => 0.0,
    }
}

/// Validate an attribute map against the fixed schema for `kind`.
pub fn validate_attrs(kind: NodeKind, attrs: &AttrMap) -> Result<(), SchemaViolation> {
    for (key, value) in attrs {
        if key == "name" {
            if !matches!(value, AttrValue::Text(_)) {
                return Err(SchemaViolation::WrongType {
                    kind,
                    key: key.clone(),
                    expected: "Text",
                    found: value.type_name(),
                });
            }
            continue;
        }
        if numeric_fields(kind).contains(&key.as_str()) {
            if value.as_numeric().is_none() {
                return Err(SchemaViolation::WrongType {
                    kind,
                    key: key.clone(),
                    expected: "Float/Int/Flag",
                    found: value.type_name(),
                });
            }
        } else if categorical_fields(kind).contains(&key.as_str()) {
            if !matches!(value, AttrValue::Text(_)) {
                return Err(SchemaViolation::WrongType {
                    kind,
                    key: key.clone(),
                    expected: "Text",
                    found: value.type_name(),
                });
            }
        } else if timestamp_fields(kind).contains(&key.as_str()) {
            if !matches!(value, AttrValue::Timestamp(_)) {
                return Err(SchemaViolation::WrongType {
                    kind,
                    key: key.clone(),
                    expected: "Timestamp",
                    found: value.type_name(),
                });
            }
        } else {
            return Err(SchemaViolation::UnknownAttribute {
                kind,
                key: key.clone(),
            });
        }
    }
    Ok(())
}

/// Allowed (source kind, target kind) pairs per relation.
pub fn endpoint_rules(relation: Relation) -> &'static [(NodeKind, NodeKind)] {
    use NodeKind::*;
    match relation {
        Relation::Supplies => &[(Supplier, Component)],
        Relation::LocatedIn => &[(Supplier, Country)],
        Relation::Covers => &[(Contract, Component)],
        Relation::SignedWith => &[(Contract, Supplier)],
        Relation::GovernedBy => &[(Supplier, Contract)],
        Relation::OriginatesIn => &[(Route, Country)],
        Relation::DeliversTo => &[(Route, Country)],
        Relation::Carries => &[(Route, Component)],
        Relation::RoutesThrough => &[(Component, Route), (Route, Country)],
        Relation::CoSupplier => &[(Supplier, Supplier)],
        Relation::TradesWith => &[(Country, Country)],
    }
}

/// Validate that a relation may connect the given endpoint kinds.
pub fn validate_endpoints(
    relation: Relation,
    source: NodeKind,
    target: NodeKind,
) -> Result<(), SchemaViolation> {
    if endpoint_rules(relation).contains(&(source, target)) {
        Ok(())
    } else {
        Err(SchemaViolation::BadEndpoints {
            relation,
            src: source,
            target,
        })
    }
}

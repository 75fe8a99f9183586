//! Alfen property ids and their mapping onto device capabilities

use std::collections::HashSet;

use serde_json::Value;

use crate::models::{CapabilityUpdate, CapabilityValue, PropertyRecord};

/// Property ids requested on every poll, in request order
pub const PROPERTY_IDS: [&str; 14] = [
    "2060_0", "2056_0", "2221_3", "2221_4", "2221_5", "2221_A", "2221_B", "2221_C", "2221_16",
    "2201_0", "2501_2", "2221_22", "2129_0", "2126_0",
];

/// Numeric transform applied to a property before it is mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Passthrough,
    /// Round to the given number of decimals
    Round(u32),
    /// Raw meter reading in Wh to kWh with two decimals
    EnergyKwh,
}

impl Transform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::Passthrough => value,
            Transform::Round(decimals) => round_to(value, decimals),
            Transform::EnergyKwh => (value / 10.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyMapping {
    pub property_id: &'static str,
    pub capability_id: &'static str,
    pub transform: Transform,
}

const fn mapping(
    property_id: &'static str,
    capability_id: &'static str,
    transform: Transform,
) -> PropertyMapping {
    PropertyMapping {
        property_id,
        capability_id,
        transform,
    }
}

pub static CAPABILITY_MAP: [PropertyMapping; 10] = [
    mapping("2221_16", "measure_power", Transform::Round(1)),
    mapping("2221_22", "meter_power", Transform::EnergyKwh),
    mapping("2221_3", "measure_current.l1", Transform::Round(0)),
    mapping("2221_4", "measure_current.l2", Transform::Round(0)),
    mapping("2221_5", "measure_current.l3", Transform::Round(0)),
    mapping("2221_A", "measure_voltage.l1", Transform::Passthrough),
    mapping("2221_B", "measure_voltage.l2", Transform::Passthrough),
    mapping("2221_C", "measure_voltage.l3", Transform::Passthrough),
    mapping("2201_0", "measure_temperature", Transform::Round(1)),
    mapping("2129_0", "measure_current.limit", Transform::Passthrough),
];

pub fn mapping_for(property_id: &str) -> Option<&'static PropertyMapping> {
    CAPABILITY_MAP.iter().find(|m| m.property_id == property_id)
}

/// Round half away from zero at `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Turn fetched property records into capability updates.
///
/// Unknown ids are dropped. A capability is updated at most once; if the
/// charger repeats an id, the first record wins.
pub fn map_properties(records: &[PropertyRecord]) -> Vec<CapabilityUpdate> {
    let mut seen = HashSet::new();
    let mut updates = Vec::new();

    for record in records {
        let Some(mapping) = mapping_for(&record.id) else {
            continue;
        };

        if !seen.insert(mapping.capability_id) {
            tracing::debug!("[Alfen] Duplicate property {} ignored", record.id);
            continue;
        }

        updates.push(CapabilityUpdate {
            capability_id: mapping.capability_id.to_string(),
            value: convert_value(&record.value, mapping.transform),
        });
    }

    updates
}

fn convert_value(value: &Value, transform: Transform) -> Option<CapabilityValue> {
    match value {
        Value::Null => None,
        Value::Number(n) => n
            .as_f64()
            .map(|v| CapabilityValue::Number(transform.apply(v))),
        Value::String(s) => Some(CapabilityValue::Text(s.clone())),
        other => Some(CapabilityValue::Text(other.to_string())),
    }
}

//! Network file schema definitions.
//!
//! A network file is what the ingestion side hands over: elements with their
//! ports and declared attributes, the port-to-port connections, and
//! optionally the reduction settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<ReduceConfigDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValueDef>,
    #[serde(default)]
    pub ports: Vec<PortDef>,
}

/// Attribute value as written in a file.
///
/// Bare numbers use the file's default unit for the attribute (metres,
/// m³/h, kW, m²); `{ value, unit }` states the unit explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValueDef {
    Bool(bool),
    Number(f64),
    Quantity { value: f64, unit: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortDef {
    pub id: String,
    /// `[x, y, z]` in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
}

/// The `reduce:` section; unset fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReduceConfigDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_power_threshold_kw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underfloor: Option<UnderfloorConfigDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnderfloorConfigDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_members: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_z_share: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_tolerance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area_m2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_m: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<[f64; 2]>,
}

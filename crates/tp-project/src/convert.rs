//! Conversion of network files into graphs and reduction options.

use std::collections::BTreeMap;

use nalgebra::Point3;
use tp_aggregation::{ReduceOptions, RuleKind};
use tp_core::{ElementId, PortId, Unit, Value};
use tp_elements::{AttrMap, AttributeName, ElementType, FlowDirection};
use tp_graph::{ConnectionGraph, GraphBuilder};
use tracing::debug;

use crate::schema::{AttributeValueDef, NetworkFile, ReduceConfigDef};
use crate::validate::validate_network;
use crate::{ProjectError, ProjectResult};

/// A graph together with the file ids of its elements and ports.
#[derive(Debug, Clone)]
pub struct BuiltNetwork {
    pub graph: ConnectionGraph,
    pub elements: BTreeMap<String, ElementId>,
    pub ports: BTreeMap<String, PortId>,
}

/// Unit of a bare number in a network file.
pub fn file_unit(name: AttributeName) -> Option<Unit> {
    match name {
        AttributeName::Length
        | AttributeName::Diameter
        | AttributeName::DiameterStrand
        | AttributeName::RatedHeight
        | AttributeName::XSpacing
        | AttributeName::YSpacing => Some(Unit::Meter),
        AttributeName::RatedPower => Some(Unit::Kilowatt),
        AttributeName::RatedVolumeFlow => Some(Unit::CubicMeterPerHour),
        AttributeName::HeatingArea => Some(Unit::SquareMeter),
        AttributeName::IsConsumer => None,
    }
}

fn attribute_value(element: &str, name: AttributeName, def: &AttributeValueDef) -> ProjectResult<Value> {
    let bad = |reason: String| ProjectError::Attribute {
        element: element.to_string(),
        attribute: name.as_str(),
        reason,
    };
    match def {
        AttributeValueDef::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValueDef::Number(n) => file_unit(name)
            .map(|unit| Value::from_magnitude(*n, unit))
            .ok_or_else(|| bad(format!("expected a flag, got {n}"))),
        AttributeValueDef::Quantity { value, unit } => Unit::parse(unit)
            .map(|unit| Value::from_magnitude(*value, unit))
            .ok_or_else(|| bad(format!("unknown unit '{unit}'"))),
    }
}

/// Validate `file` and build its connection graph.
pub fn build_graph(file: &NetworkFile) -> ProjectResult<BuiltNetwork> {
    validate_network(file)?;
    let mut builder = GraphBuilder::new();
    let mut elements = BTreeMap::new();
    let mut ports = BTreeMap::new();

    for def in &file.elements {
        let kind = ElementType::parse(&def.kind).map_err(tp_graph::GraphError::from)?;
        let mut attributes = AttrMap::new();
        for (name, value) in &def.attributes {
            let name = AttributeName::parse(name).map_err(tp_graph::GraphError::from)?;
            attributes.insert(name, attribute_value(&def.id, name, value)?);
        }
        let name = def.name.clone().unwrap_or_else(|| def.id.clone());
        let id = builder.add_element_with(kind, name, attributes)?;
        builder.set_guid(id, def.id.clone())?;
        elements.insert(def.id.clone(), id);

        for port in &def.ports {
            let flow = match &port.flow {
                Some(tag) => FlowDirection::parse(tag).ok_or_else(|| ProjectError::Attribute {
                    element: def.id.clone(),
                    attribute: "flow",
                    reason: format!("unknown flow direction '{tag}'"),
                })?,
                None => FlowDirection::Unknown,
            };
            let position = port.position.map(|[x, y, z]| Point3::new(x, y, z));
            ports.insert(port.id.clone(), builder.add_port_with(id, position, flow)?);
        }
    }

    for connection in &file.connections {
        let lookup = |id: &String| {
            ports.get(id).copied().ok_or_else(|| {
                ProjectError::Validation(crate::ValidationError::MissingReference {
                    id: id.clone(),
                    context: "connections".to_string(),
                })
            })
        };
        let (from, to) = (lookup(&connection.from)?, lookup(&connection.to)?);
        builder
            .connect(from, to)
            .map_err(|source| ProjectError::Connect {
                from: connection.from.clone(),
                to: connection.to.clone(),
                source,
            })?;
    }

    debug!(
        elements = elements.len(),
        ports = ports.len(),
        connections = file.connections.len(),
        "built network '{}'",
        file.name
    );
    Ok(BuiltNetwork {
        graph: builder.build()?,
        elements,
        ports,
    })
}

/// Reduction options from a `reduce:` section, defaults for unset fields.
pub fn reduce_options(config: Option<&ReduceConfigDef>) -> ProjectResult<ReduceOptions> {
    let mut options = ReduceOptions::default();
    let Some(config) = config else {
        return Ok(options);
    };
    if let Some(rules) = &config.rules {
        options.rules = rules
            .iter()
            .map(|name| {
                RuleKind::parse(name).ok_or_else(|| {
                    ProjectError::Validation(crate::ValidationError::InvalidValue {
                        field: "reduce.rules".to_string(),
                        value: name.clone(),
                        reason: "unknown rule".to_string(),
                    })
                })
            })
            .collect::<ProjectResult<_>>()?;
    }
    if let Some(threshold) = config.parallel_power_threshold_kw {
        options.parallel_power_threshold = threshold;
    }
    if let Some(passes) = config.max_passes {
        options.max_passes = passes;
    }
    if let Some(u) = &config.underfloor {
        let c = &mut options.underfloor;
        if let Some(v) = u.min_members {
            c.min_members = v;
        }
        if let Some(v) = u.min_z_share {
            c.min_z_share = v;
        }
        if let Some(v) = u.z_tolerance_m {
            c.z_tolerance = v;
        }
        if let Some(v) = u.min_area_m2 {
            c.min_area = v;
        }
        if let Some([low, high]) = u.spacing_m {
            c.spacing = (low, high);
        }
        if let Some([low, high]) = u.density {
            c.density = (low, high);
        }
    }
    Ok(options)
}

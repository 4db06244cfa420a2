//! Network file validation logic.

use std::collections::{HashMap, HashSet};

use tp_elements::{AttributeName, ElementType};

use crate::schema::NetworkFile;

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl Into<String>, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.into(),
        reason: reason.to_string(),
    }
}

/// Check ids, type names and references without building anything.
pub fn validate_network(file: &NetworkFile) -> Result<(), ValidationError> {
    if file.version == 0 || file.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: file.version,
        });
    }

    let mut element_ids = HashSet::new();
    let mut port_owner: HashMap<&str, &str> = HashMap::new();
    for element in &file.elements {
        if !element_ids.insert(element.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: element.id.clone(),
                context: "elements".to_string(),
            });
        }
        let kind = ElementType::parse(&element.kind)
            .map_err(|_| invalid(format!("{}.type", element.id), &element.kind, "unknown element type"))?;
        if kind.is_aggregate() {
            return Err(invalid(
                format!("{}.type", element.id),
                &element.kind,
                "aggregates are created by the reduction",
            ));
        }
        for name in element.attributes.keys() {
            AttributeName::parse(name).map_err(|_| {
                invalid(format!("{}.attributes", element.id), name, "unknown attribute")
            })?;
        }
        for port in &element.ports {
            if port_owner.insert(port.id.as_str(), element.id.as_str()).is_some() {
                return Err(ValidationError::DuplicateId {
                    id: port.id.clone(),
                    context: "ports".to_string(),
                });
            }
            if let Some(position) = port.position {
                if position.iter().any(|c| !c.is_finite()) {
                    return Err(invalid(
                        format!("{}.position", port.id),
                        format!("{position:?}"),
                        "coordinates must be finite",
                    ));
                }
            }
        }
    }

    for (index, connection) in file.connections.iter().enumerate() {
        let context = format!("connections[{index}]");
        for id in [&connection.from, &connection.to] {
            if !port_owner.contains_key(id.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: id.clone(),
                    context: context.clone(),
                });
            }
        }
    }

    if let Some(reduce) = &file.reduce {
        if let Some(threshold) = reduce.parallel_power_threshold_kw {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(invalid(
                    "reduce.parallel_power_threshold_kw",
                    threshold.to_string(),
                    "must be finite and non-negative",
                ));
            }
        }
        if reduce.max_passes == Some(0) {
            return Err(invalid("reduce.max_passes", "0", "must be at least 1"));
        }
    }
    Ok(())
}

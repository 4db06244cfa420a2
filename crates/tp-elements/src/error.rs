//! Error types for element construction and attribute handling.

use tp_core::error::TpError;
use tp_core::{ElementId, PortId};
use thiserror::Error;

/// Errors raised while describing elements and their attributes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("Unknown element type: {name}")]
    UnknownType { name: String },

    #[error("Unknown attribute: {name}")]
    UnknownAttribute { name: String },

    #[error("Attribute {attribute} of element {element} rejected: {source}")]
    InvalidValue {
        element: ElementId,
        attribute: &'static str,
        source: TpError,
    },

    #[error("Port {port} does not belong to element {element}")]
    ForeignPort { element: ElementId, port: PortId },
}

pub type ElementResult<T> = Result<T, ElementError>;

impl From<ElementError> for TpError {
    fn from(e: ElementError) -> Self {
        match e {
            ElementError::InvalidValue { source, .. } => source,
            other => TpError::Invariant {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ElementError::UnknownType {
            name: "Chiller".into(),
        };
        assert!(err.to_string().contains("Chiller"));
    }

    #[test]
    fn error_conversion() {
        let err = ElementError::InvalidValue {
            element: ElementId::from_index(0),
            attribute: "length",
            source: TpError::UnitMismatch {
                what: "length",
                expected: "length",
                actual: "power",
            },
        };
        let tp_err: TpError = err.into();
        assert!(matches!(tp_err, TpError::UnitMismatch { .. }));
    }
}

//! tp-elements: elements, ports and engineering attributes.
//!
//! Provides:
//! - Element type tags for physical devices and aggregates
//! - Ports with position, flow direction and a single connection slot
//! - Explicit per-type attribute schemas with ordered resolver chains
//! - Lazy, memoized attribute resolution including multi-output computations
//!
//! # Example
//!
//! ```
//! use tp_core::{ElementId, Unit, Value, m, mm};
//! use tp_elements::{AttrMap, AttributeName, Element, ElementType};
//!
//! let mut attrs = AttrMap::new();
//! attrs.insert(AttributeName::Length, Value::from(m(0.1)));
//! attrs.insert(AttributeName::Diameter, Value::from(mm(30.0)));
//! let pipe = Element::new(ElementId::from_index(0), ElementType::Pipe, "pipe")
//!     .with_attributes(attrs)
//!     .unwrap();
//!
//! assert_eq!(pipe.get_in(AttributeName::Diameter, Unit::Millimeter), Some(30.0));
//! ```

pub mod attribute;
pub mod element;
pub mod error;
pub mod kind;
pub mod port;
pub mod schema;

// Re-exports
pub use attribute::{AttrMap, AttributeDef, AttributeName, MultiCalc, Resolver, Slot};
pub use element::Element;
pub use error::{ElementError, ElementResult};
pub use kind::ElementType;
pub use port::{FlowDirection, Port};
pub use schema::hydraulic_power;

//! Attribute schema and lazy, memoizing attribute storage.
//!
//! Every element type declares a fixed set of attribute slots. A slot is
//! resolved on first access in this order:
//!
//! 1. value cached from an earlier resolution
//! 2. source-backed value delivered by ingestion (or preset by a rule)
//! 3. the first resolver of the slot that yields a value
//! 4. the undetermined sentinel, left for the decision collaborator
//!
//! Resolved values are checked against the slot's canonical unit. A
//! [`MultiCalc`] resolver produces several slots in one pass; all of its
//! outputs are cached together so asking for a sibling is free.

use core::cell::RefCell;
use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use tp_core::{Unit, Value};

use crate::element::Element;
use crate::error::{ElementError, ElementResult};

/// Values keyed by attribute name.
pub type AttrMap = BTreeMap<AttributeName, Value>;

/// Names of the engineering attributes known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeName {
    Length,
    Diameter,
    DiameterStrand,
    RatedPower,
    RatedHeight,
    RatedVolumeFlow,
    HeatingArea,
    XSpacing,
    YSpacing,
    IsConsumer,
}

impl AttributeName {
    pub const ALL: [AttributeName; 10] = [
        AttributeName::Length,
        AttributeName::Diameter,
        AttributeName::DiameterStrand,
        AttributeName::RatedPower,
        AttributeName::RatedHeight,
        AttributeName::RatedVolumeFlow,
        AttributeName::HeatingArea,
        AttributeName::XSpacing,
        AttributeName::YSpacing,
        AttributeName::IsConsumer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeName::Length => "length",
            AttributeName::Diameter => "diameter",
            AttributeName::DiameterStrand => "diameter_strand",
            AttributeName::RatedPower => "rated_power",
            AttributeName::RatedHeight => "rated_height",
            AttributeName::RatedVolumeFlow => "rated_volume_flow",
            AttributeName::HeatingArea => "heating_area",
            AttributeName::XSpacing => "x_spacing",
            AttributeName::YSpacing => "y_spacing",
            AttributeName::IsConsumer => "is_consumer",
        }
    }

    pub fn parse(name: &str) -> ElementResult<Self> {
        Self::ALL
            .into_iter()
            .find(|attr| attr.as_str() == name.trim())
            .ok_or_else(|| ElementError::UnknownAttribute {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One computation producing several attributes at once.
#[derive(Clone, Copy)]
pub struct MultiCalc {
    pub name: &'static str,
    pub outputs: &'static [AttributeName],
    pub compute: fn(&Element) -> AttrMap,
}

impl fmt::Debug for MultiCalc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiCalc")
            .field("name", &self.name)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// A fallback computation for an attribute slot.
#[derive(Clone, Copy)]
pub enum Resolver {
    Single(fn(&Element) -> Option<Value>),
    Multi(MultiCalc),
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Single(_) => f.write_str("Single(..)"),
            Resolver::Multi(calc) => write!(f, "Multi({})", calc.name),
        }
    }
}

/// Declaration of one attribute slot of an element type.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDef {
    pub name: AttributeName,
    pub description: &'static str,
    /// Canonical unit; `None` for flags and lists.
    pub unit: Option<Unit>,
    pub functions: &'static [Resolver],
}

impl AttributeDef {
    /// The multi-output computation this slot belongs to, if any.
    pub fn multi(&self) -> Option<&MultiCalc> {
        self.functions.iter().find_map(|f| match f {
            Resolver::Multi(calc) => Some(calc),
            Resolver::Single(_) => None,
        })
    }
}

/// Resolution state of an attribute slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Resolved(Value),
    Undetermined,
}

impl Slot {
    pub fn value(&self) -> Option<Value> {
        match self {
            Slot::Resolved(v) => Some(v.clone()),
            Slot::Undetermined => None,
        }
    }
}

/// Per-element attribute storage.
///
/// Caching happens behind a shared reference so that pattern matching can
/// query attributes without mutating the graph.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    source: AttrMap,
    cache: RefCell<BTreeMap<AttributeName, Slot>>,
    requested: RefCell<BTreeSet<AttributeName>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: AttrMap) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn source(&self, name: AttributeName) -> Option<&Value> {
        self.source.get(&name)
    }

    /// Set a source-backed value, dropping any cached resolution of that slot.
    pub fn set_source(&mut self, name: AttributeName, value: Value) {
        self.source.insert(name, value);
        self.cache.get_mut().remove(&name);
    }

    pub fn cached(&self, name: AttributeName) -> Option<Slot> {
        self.cache.borrow().get(&name).cloned()
    }

    pub fn store(&self, name: AttributeName, slot: Slot) {
        self.cache.borrow_mut().insert(name, slot);
    }

    /// Forget the cached resolution so the next access recomputes it.
    pub fn invalidate(&self, name: AttributeName) {
        self.cache.borrow_mut().remove(&name);
    }

    pub fn mark_requested(&self, name: AttributeName) {
        self.requested.borrow_mut().insert(name);
    }

    pub fn requested(&self) -> Vec<AttributeName> {
        self.requested.borrow().iter().copied().collect()
    }
}

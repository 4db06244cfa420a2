//! Elements: nodes of the topology with owned ports and lazy attributes.

use nalgebra::Point3;
use tp_core::{ElementId, PortId, Unit, Value};
use tracing::warn;

use crate::attribute::{
    AttrMap, AttributeDef, AttributeName, AttributeStore, Resolver, Slot,
};
use crate::error::{ElementError, ElementResult};
use crate::kind::ElementType;
use crate::port::Port;

/// A physical device, or an aggregate standing in for several of them.
///
/// An element exclusively owns its ports. Aggregates also own the elements
/// they absorbed (`members`); those are no longer part of any graph but stay
/// reachable for attribute computations.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub guid: String,
    pub name: String,
    pub kind: ElementType,
    pub ports: Vec<Port>,
    pub members: Vec<Element>,
    attributes: AttributeStore,
}

impl Element {
    pub fn new(id: ElementId, kind: ElementType, name: impl Into<String>) -> Self {
        Self {
            id,
            guid: format!("{}-{}", kind.name(), id.index()),
            name: name.into(),
            kind,
            ports: Vec::new(),
            members: Vec::new(),
            attributes: AttributeStore::new(),
        }
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = guid.into();
        self
    }

    /// Attach source-backed attribute values.
    pub fn with_attributes(mut self, values: AttrMap) -> ElementResult<Self> {
        for (name, value) in values {
            self.set_attribute(name, value)?;
        }
        Ok(self)
    }

    /// Set a source-backed value after checking it against the schema unit.
    pub fn set_attribute(&mut self, name: AttributeName, value: Value) -> ElementResult<()> {
        let value = match self.def(name).and_then(|def| def.unit) {
            Some(unit) => value
                .conform(unit, name.as_str())
                .map_err(|source| ElementError::InvalidValue {
                    element: self.id,
                    attribute: name.as_str(),
                    source,
                })?,
            None => value,
        };
        self.attributes.set_source(name, value);
        Ok(())
    }

    pub fn def(&self, name: AttributeName) -> Option<&'static AttributeDef> {
        self.kind.schema().iter().find(|def| def.name == name)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.id == id)
    }

    pub fn port_ids(&self) -> impl Iterator<Item = PortId> + '_ {
        self.ports.iter().map(|p| p.id)
    }

    /// Stable, export-facing name of a port.
    ///
    /// Two-port elements use `port_a`/`port_b`, everything else `ports[i]`
    /// with a 1-based index.
    pub fn port_name(&self, id: PortId) -> ElementResult<String> {
        let index = self
            .ports
            .iter()
            .position(|p| p.id == id)
            .ok_or(ElementError::ForeignPort {
                element: self.id,
                port: id,
            })?;
        Ok(match (self.ports.len(), index) {
            (2, 0) => "port_a".to_string(),
            (2, _) => "port_b".to_string(),
            (_, i) => format!("ports[{}]", i + 1),
        })
    }

    /// Mean of the known port positions.
    pub fn position(&self) -> Option<Point3<f64>> {
        let positions: Vec<_> = self.ports.iter().filter_map(|p| p.position).collect();
        if positions.is_empty() {
            return None;
        }
        let sum = positions
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / positions.len() as f64))
    }

    /// Number of physical elements represented, counting through aggregates.
    pub fn leaf_count(&self) -> usize {
        if self.members.is_empty() {
            1
        } else {
            self.members.iter().map(Element::leaf_count).sum()
        }
    }

    /// Mark an attribute as needed.
    ///
    /// Aggregates forward the request to their members, widened to every
    /// output of the multi-output computation the attribute belongs to.
    pub fn request(&self, name: AttributeName) {
        self.attributes.mark_requested(name);
        if self.members.is_empty() {
            return;
        }
        let names: &[AttributeName] = match self.def(name).and_then(|def| def.multi()) {
            Some(calc) => calc.outputs,
            None => core::slice::from_ref(&name),
        };
        for member in &self.members {
            for n in names {
                member.request(*n);
            }
        }
    }

    /// Requested attributes that could not be resolved.
    pub fn undetermined(&self) -> Vec<AttributeName> {
        self.attributes
            .requested()
            .into_iter()
            .filter(|name| self.get_attribute(*name).is_none())
            .collect()
    }

    pub fn invalidate(&self, name: AttributeName) {
        self.attributes.invalidate(name);
    }

    /// Resolve an attribute, computing and caching it on first access.
    pub fn get_attribute(&self, name: AttributeName) -> Option<Value> {
        if let Some(slot) = self.attributes.cached(name) {
            return slot.value();
        }
        let slot = self.resolve(name);
        let value = slot.value();
        self.attributes.store(name, slot);
        value
    }

    /// Resolve an attribute and report it in `unit`.
    pub fn get_in(&self, name: AttributeName, unit: Unit) -> Option<f64> {
        self.get_attribute(name)?.magnitude_in(unit)
    }

    pub fn length(&self) -> Option<tp_core::Length> {
        self.get_attribute(AttributeName::Length)?.as_length()
    }

    pub fn diameter(&self) -> Option<tp_core::Length> {
        self.get_attribute(AttributeName::Diameter)?.as_length()
    }

    fn resolve(&self, name: AttributeName) -> Slot {
        let def = self.def(name);
        if let Some(value) = self.attributes.source(name) {
            if let Some(value) = self.checked(def, value.clone()) {
                return Slot::Resolved(value);
            }
        }
        let Some(def) = def else {
            return Slot::Undetermined;
        };
        for function in def.functions {
            match function {
                Resolver::Single(f) => {
                    if let Some(value) = f(self).and_then(|v| self.checked(Some(def), v)) {
                        return Slot::Resolved(value);
                    }
                }
                Resolver::Multi(calc) => {
                    let mut outputs = (calc.compute)(self);
                    for sibling in calc.outputs.iter().copied().filter(|n| *n != name) {
                        if self.attributes.source(sibling).is_some()
                            || self.attributes.cached(sibling).is_some()
                        {
                            continue;
                        }
                        let slot = outputs
                            .remove(&sibling)
                            .and_then(|v| self.checked(self.def(sibling), v))
                            .map_or(Slot::Undetermined, Slot::Resolved);
                        self.attributes.store(sibling, slot);
                    }
                    if let Some(value) = outputs.remove(&name).and_then(|v| self.checked(Some(def), v))
                    {
                        return Slot::Resolved(value);
                    }
                }
            }
        }
        Slot::Undetermined
    }

    fn checked(&self, def: Option<&AttributeDef>, value: Value) -> Option<Value> {
        let Some(def) = def else {
            return Some(value);
        };
        let Some(unit) = def.unit else {
            return Some(value);
        };
        match value.conform(unit, def.name.as_str()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(element = %self.name, attribute = %def.name, "{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_core::{kw, m, m3ph, mm};

    fn pipe(index: u32, length: f64, diameter: f64) -> Element {
        let id = ElementId::from_index(index);
        let mut attrs = AttrMap::new();
        attrs.insert(AttributeName::Length, Value::from(m(length)));
        attrs.insert(AttributeName::Diameter, Value::from(mm(diameter)));
        Element::new(id, ElementType::Pipe, format!("pipe{index}"))
            .with_attributes(attrs)
            .unwrap()
    }

    #[test]
    fn source_value_wins() {
        let p = pipe(0, 0.1, 30.0);
        assert_eq!(p.get_in(AttributeName::Diameter, Unit::Millimeter), Some(30.0));
    }

    #[test]
    fn wrong_unit_rejected_on_set() {
        let mut p = pipe(0, 0.1, 30.0);
        let err = p
            .set_attribute(AttributeName::Length, Value::from(kw(1.0)))
            .unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { .. }));
    }

    #[test]
    fn missing_value_is_undetermined() {
        let p = Element::new(ElementId::from_index(0), ElementType::Pipe, "bare");
        p.request(AttributeName::Length);
        assert_eq!(p.get_attribute(AttributeName::Length), None);
        assert_eq!(p.undetermined(), vec![AttributeName::Length]);
    }

    #[test]
    fn pump_power_falls_back_to_hydraulic_formula() {
        let mut attrs = AttrMap::new();
        attrs.insert(AttributeName::RatedVolumeFlow, Value::from(m3ph(3.6)));
        attrs.insert(AttributeName::RatedHeight, Value::from(m(1.0)));
        let pump = Element::new(ElementId::from_index(0), ElementType::Pump, "p")
            .with_attributes(attrs)
            .unwrap();
        let watts = pump.get_in(AttributeName::RatedPower, Unit::Watt).unwrap();
        assert!((watts - 9.81).abs() < 1e-9);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let mut p = pipe(0, 1.0, 20.0);
        assert!(p.length().is_some());
        p.set_attribute(AttributeName::Length, Value::from(m(3.0))).unwrap();
        assert_eq!(p.length(), Some(m(3.0)));
        p.invalidate(AttributeName::Length);
        assert_eq!(p.length(), Some(m(3.0)));
    }

    #[test]
    fn port_names_are_stable() {
        let mut p = pipe(0, 1.0, 20.0);
        p.ports.push(Port::new(PortId::from_index(0), p.id));
        p.ports.push(Port::new(PortId::from_index(1), p.id));
        assert_eq!(p.port_name(PortId::from_index(0)).unwrap(), "port_a");
        assert_eq!(p.port_name(PortId::from_index(1)).unwrap(), "port_b");
        assert!(p.port_name(PortId::from_index(9)).is_err());

        let mut tee = Element::new(ElementId::from_index(1), ElementType::PipeFitting, "tee");
        for i in 2..5 {
            tee.ports.push(Port::new(PortId::from_index(i), tee.id));
        }
        assert_eq!(tee.port_name(PortId::from_index(4)).unwrap(), "ports[3]");
    }

    #[test]
    fn position_is_port_midpoint() {
        let mut p = pipe(0, 1.0, 20.0);
        p.ports.push(
            Port::new(PortId::from_index(0), p.id).with_position(Point3::new(0.0, 0.0, 0.0)),
        );
        p.ports.push(
            Port::new(PortId::from_index(1), p.id).with_position(Point3::new(2.0, 0.0, 0.0)),
        );
        assert_eq!(p.position(), Some(Point3::new(1.0, 0.0, 0.0)));
    }
}

//! Incremental graph builder.

use nalgebra::Point3;
use tp_core::{ElementId, PortId};
use tp_elements::{AttrMap, Element, ElementType, FlowDirection, Port};

use crate::error::{ConnectError, GraphError, GraphResult};
use crate::graph::ConnectionGraph;
use crate::validate;

/// Builder for constructing a connection graph from ingested components.
///
/// Use `add_element`, `add_port` and `connect` to build up the topology,
/// then call `build()` to validate it and hand it to the reduction.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: ConnectionGraph,
}

impl GraphBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element without attributes and return its id.
    pub fn add_element(&mut self, kind: ElementType, name: impl Into<String>) -> ElementId {
        let id = self.graph.element_ids.next_id();
        self.graph.insert_element(Element::new(id, kind, name));
        id
    }

    /// Add an element with source-backed attribute values.
    pub fn add_element_with(
        &mut self,
        kind: ElementType,
        name: impl Into<String>,
        attributes: AttrMap,
    ) -> GraphResult<ElementId> {
        let id = self.graph.element_ids.next_id();
        let element = Element::new(id, kind, name).with_attributes(attributes)?;
        self.graph.insert_element(element);
        Ok(id)
    }

    /// Replace the guid assigned by default.
    pub fn set_guid(&mut self, element: ElementId, guid: impl Into<String>) -> GraphResult<()> {
        self.graph.element_mut(element)?.guid = guid.into();
        Ok(())
    }

    /// Append an open port to an element.
    pub fn add_port(&mut self, element: ElementId) -> GraphResult<PortId> {
        self.add_port_with(element, None, FlowDirection::Unknown)
    }

    /// Append a port with known position and flow direction.
    pub fn add_port_with(
        &mut self,
        element: ElementId,
        position: Option<Point3<f64>>,
        flow: FlowDirection,
    ) -> GraphResult<PortId> {
        if !self.graph.contains(element) {
            return Err(GraphError::UnknownElement { element });
        }
        let id = self.graph.port_ids.next_id();
        let mut port = Port::new(id, element).with_flow(flow);
        port.position = position;
        self.graph.element_mut(element)?.ports.push(port);
        self.graph.port_owner.insert(id, element);
        Ok(id)
    }

    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<(), ConnectError> {
        self.graph.connect(a, b)
    }

    pub fn disconnect(&mut self, port: PortId) -> Result<(), ConnectError> {
        self.graph.disconnect(port)
    }

    pub fn element_count(&self) -> usize {
        self.graph.element_count()
    }

    /// Validate and return the graph.
    pub fn build(self) -> GraphResult<ConnectionGraph> {
        validate::validate_structure(&self.graph)?;
        validate::validate_connections(&self.graph)?;
        Ok(self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_empty_graph() {
        let graph = GraphBuilder::new().build().unwrap();
        assert_eq!(graph.element_count(), 0);
        assert!(graph.get_connections().is_empty());
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut b = GraphBuilder::new();
        let e0 = b.add_element(ElementType::Pipe, "a");
        let e1 = b.add_element(ElementType::Pump, "b");
        let p0 = b.add_port(e0).unwrap();
        let p1 = b.add_port(e1).unwrap();
        assert!(e0 < e1);
        assert!(p0 < p1);
        b.connect(p0, p1).unwrap();
        let g = b.build().unwrap();
        assert_eq!(g.owner(p1).unwrap(), e1);
        assert_eq!(g.get_connections(), vec![(p0, p1)]);
    }

    #[test]
    fn port_on_unknown_element_fails() {
        let mut b = GraphBuilder::new();
        let err = b.add_port(ElementId::from_index(7)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownElement { .. }));
    }

    #[test]
    fn attributes_are_conformed() {
        let mut b = GraphBuilder::new();
        let mut attrs = AttrMap::new();
        attrs.insert(
            tp_elements::AttributeName::Length,
            tp_core::Value::from(tp_core::kw(1.0)),
        );
        assert!(b.add_element_with(ElementType::Pipe, "bad", attrs).is_err());
    }
}

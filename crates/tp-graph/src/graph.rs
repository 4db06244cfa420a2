//! Connection graph: an arena of active elements joined by port connections.

use std::collections::{BTreeMap, BTreeSet};

use tp_core::{ElementId, IdAllocator, PortId};
use tp_elements::{Element, Port};

use crate::error::{ConnectError, GraphError, GraphResult};

/// The topology being reduced.
///
/// Elements are stored by id; ids are never reused, so an id that has been
/// absorbed by a rewrite simply stops resolving. Edges are not stored
/// separately: every connected port names its partner and the graph keeps
/// both halves in sync.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    pub(crate) elements: BTreeMap<ElementId, Element>,
    /// Owner index over all active ports.
    pub(crate) port_owner: BTreeMap<PortId, ElementId>,
    pub(crate) element_ids: IdAllocator,
    pub(crate) port_ids: IdAllocator,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active elements in ascending id order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.keys().copied()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn element(&self, id: ElementId) -> GraphResult<&Element> {
        self.elements
            .get(&id)
            .ok_or(GraphError::UnknownElement { element: id })
    }

    pub fn element_mut(&mut self, id: ElementId) -> GraphResult<&mut Element> {
        self.elements
            .get_mut(&id)
            .ok_or(GraphError::UnknownElement { element: id })
    }

    /// Element owning a port.
    pub fn owner(&self, port: PortId) -> GraphResult<ElementId> {
        self.port_owner
            .get(&port)
            .copied()
            .ok_or(GraphError::UnknownPort { port })
    }

    pub fn port(&self, port: PortId) -> GraphResult<&Port> {
        let owner = self.owner(port)?;
        self.element(owner)?
            .port(port)
            .ok_or(GraphError::UnknownPort { port })
    }

    fn port_mut(&mut self, port: PortId) -> Result<&mut Port, ConnectError> {
        let owner = *self
            .port_owner
            .get(&port)
            .ok_or(ConnectError::UnknownPort { port })?;
        self.elements
            .get_mut(&owner)
            .and_then(|e| e.port_mut(port))
            .ok_or(ConnectError::UnknownPort { port })
    }

    pub fn is_connected(&self, port: PortId) -> bool {
        self.port(port).is_ok_and(Port::is_connected)
    }

    /// Partner of a connected port.
    pub fn connected_port(&self, port: PortId) -> Option<PortId> {
        self.port(port).ok().and_then(|p| p.connection)
    }

    /// Connect two ports symmetrically.
    ///
    /// Reconnecting an already connected pair is a no-op.
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<(), ConnectError> {
        let owner_a = *self
            .port_owner
            .get(&a)
            .ok_or(ConnectError::UnknownPort { port: a })?;
        let owner_b = *self
            .port_owner
            .get(&b)
            .ok_or(ConnectError::UnknownPort { port: b })?;
        if owner_a == owner_b {
            return Err(ConnectError::SameElement {
                element: owner_a,
                a,
                b,
            });
        }
        let current_a = self.port_mut(a)?.connection;
        let current_b = self.port_mut(b)?.connection;
        match (current_a, current_b) {
            (Some(x), Some(y)) if x == b && y == a => return Ok(()),
            (Some(partner), _) => return Err(ConnectError::AlreadyConnected { port: a, partner }),
            (_, Some(partner)) => return Err(ConnectError::AlreadyConnected { port: b, partner }),
            (None, None) => {}
        }
        self.port_mut(a)?.connection = Some(b);
        self.port_mut(b)?.connection = Some(a);
        Ok(())
    }

    /// Clear a port's connection on both sides. Idempotent.
    pub fn disconnect(&mut self, port: PortId) -> Result<(), ConnectError> {
        let Some(partner) = self.port_mut(port)?.connection.take() else {
            return Ok(());
        };
        let other = self.port_mut(partner)?;
        if other.connection == Some(port) {
            other.connection = None;
        }
        Ok(())
    }

    /// Distinct neighbouring elements in ascending id order.
    pub fn neighbors(&self, id: ElementId) -> Vec<ElementId> {
        let Some(element) = self.elements.get(&id) else {
            return Vec::new();
        };
        let set: BTreeSet<ElementId> = element
            .ports
            .iter()
            .filter_map(|p| p.connection)
            .filter_map(|partner| self.port_owner.get(&partner).copied())
            .collect();
        set.into_iter().collect()
    }

    /// Number of distinct neighbours.
    pub fn degree(&self, id: ElementId) -> usize {
        self.neighbors(id).len()
    }

    /// All edges as `(a, b)` with `a < b`, sorted.
    pub fn get_connections(&self) -> Vec<(PortId, PortId)> {
        let mut edges: Vec<(PortId, PortId)> = self
            .elements
            .values()
            .flat_map(|e| e.ports.iter())
            .filter_map(|p| p.connection.map(|q| (p.id, q)))
            .filter(|(a, b)| a < b)
            .collect();
        edges.sort();
        edges
    }

    /// `"{element}.{port_name}"` for export and reporting.
    pub fn port_reference(&self, port: PortId) -> GraphResult<String> {
        let element = self.element(self.owner(port)?)?;
        Ok(format!("{}.{}", element.name, element.port_name(port)?))
    }

    /// Ports of `nodes` connected to an element outside `nodes`, in element
    /// then port order.
    pub fn external_ports(&self, nodes: &BTreeSet<ElementId>) -> Vec<PortId> {
        nodes
            .iter()
            .filter_map(|id| self.elements.get(id))
            .flat_map(|e| e.ports.iter())
            .filter(|p| {
                p.connection
                    .and_then(|q| self.port_owner.get(&q))
                    .is_some_and(|owner| !nodes.contains(owner))
            })
            .map(|p| p.id)
            .collect()
    }

    /// Edges with both endpoints inside `nodes`, as sorted `(a, b)` pairs.
    pub fn inner_connections(&self, nodes: &BTreeSet<ElementId>) -> Vec<(PortId, PortId)> {
        nodes
            .iter()
            .filter_map(|id| self.elements.get(id))
            .flat_map(|e| e.ports.iter())
            .filter_map(|p| p.connection.map(|q| (p.id, q)))
            .filter(|(a, b)| {
                a < b
                    && self
                        .port_owner
                        .get(b)
                        .is_some_and(|owner| nodes.contains(owner))
            })
            .collect()
    }

    pub(crate) fn insert_element(&mut self, element: Element) {
        for port in &element.ports {
            self.port_owner.insert(port.id, element.id);
        }
        self.elements.insert(element.id, element);
    }

    pub(crate) fn remove_element(&mut self, id: ElementId) -> Option<Element> {
        let element = self.elements.remove(&id)?;
        for port in &element.ports {
            self.port_owner.remove(&port.id);
        }
        Some(element)
    }
}

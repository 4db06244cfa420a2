//! Connection points of elements.

use nalgebra::Point3;
use tp_core::{ElementId, PortId};

/// Flow direction tag of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowDirection {
    #[default]
    Unknown,
    Source,
    Sink,
    Bidirectional,
}

impl FlowDirection {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "unknown" => Some(FlowDirection::Unknown),
            "source" => Some(FlowDirection::Source),
            "sink" => Some(FlowDirection::Sink),
            "bidirectional" | "sinkandsource" => Some(FlowDirection::Bidirectional),
            _ => None,
        }
    }
}

/// A port belongs to exactly one element and holds at most one connection.
///
/// The connection is stored on both sides; the graph keeps the two halves in
/// sync. Ports of aggregates list the absorbed ports they stand for in
/// `originals`.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub id: PortId,
    pub owner: ElementId,
    /// Position in metres, when the building model provides one.
    pub position: Option<Point3<f64>>,
    pub flow: FlowDirection,
    pub connection: Option<PortId>,
    pub originals: Vec<PortId>,
}

impl Port {
    pub fn new(id: PortId, owner: ElementId) -> Self {
        Self {
            id,
            owner,
            position: None,
            flow: FlowDirection::Unknown,
            connection: None,
            originals: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_flow(mut self, flow: FlowDirection) -> Self {
        self.flow = flow;
        self
    }

    /// Port of an aggregate representing one or more absorbed ports.
    pub fn aggregate(id: PortId, owner: ElementId, originals: Vec<PortId>) -> Self {
        Self {
            originals,
            ..Self::new(id, owner)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn is_aggregate_port(&self) -> bool {
        !self.originals.is_empty()
    }
}

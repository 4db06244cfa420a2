//! Graph-specific error types.

use tp_core::{ElementId, PortId, TpError};
use thiserror::Error;
use tp_elements::ElementError;

/// Failure of a single `connect` call.
///
/// Recoverable: the caller decides whether to retry with another port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Port {port} does not exist")]
    UnknownPort { port: PortId },

    #[error("Ports {a} and {b} both belong to element {element}")]
    SameElement {
        element: ElementId,
        a: PortId,
        b: PortId,
    },

    /// The port already holds a connection to a different port.
    #[error("Port {port} is already connected to port {partner}")]
    AlreadyConnected { port: PortId, partner: PortId },
}

/// Graph construction, validation and rewrite errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Element {element} is not part of the graph")]
    UnknownElement { element: ElementId },

    #[error("Port {port} is not part of the graph")]
    UnknownPort { port: PortId },

    /// A port's owner field disagrees with the element holding it.
    #[error("Port {port} should belong to element {expected} but references {actual}")]
    OwnerMismatch {
        port: PortId,
        expected: ElementId,
        actual: ElementId,
    },

    #[error("Port {port} appears twice")]
    DuplicatePort { port: PortId },

    #[error("Port {a} connects to {b} but the connection is not mirrored")]
    AsymmetricConnection { a: PortId, b: PortId },

    #[error("Port {port} connects element {element} to itself")]
    SelfLoop { element: ElementId, port: PortId },

    /// A rewrite mapping does not account for a port correctly.
    #[error("Replacement mapping invalid at port {port}: {reason}")]
    InconsistentMapping { port: PortId, reason: &'static str },

    /// Fused ports would end up with more than one connection.
    #[error("Port {port} would receive more than one connection after the rewrite")]
    FusionConflict { port: PortId },

    #[error("Element {element} is absorbed more than once")]
    AlreadyAbsorbed { element: ElementId },

    #[error("Aggregate '{name}' has no members or an empty port")]
    MalformedAggregate { name: String },

    #[error(transparent)]
    Element(#[from] ElementError),
}

impl From<ConnectError> for GraphError {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::UnknownPort { port } => GraphError::UnknownPort { port },
            ConnectError::SameElement { element, a, .. } => GraphError::SelfLoop { element, port: a },
            ConnectError::AlreadyConnected { port, .. } => GraphError::FusionConflict { port },
        }
    }
}

impl From<GraphError> for TpError {
    fn from(err: GraphError) -> Self {
        TpError::Invariant {
            what: err.to_string(),
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

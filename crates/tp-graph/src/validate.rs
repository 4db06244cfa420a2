//! Graph validation logic.

use std::collections::BTreeSet;

use tp_core::PortId;

use crate::error::{GraphError, GraphResult};
use crate::graph::ConnectionGraph;

/// Ports are unique, owned by the element holding them and indexed.
pub(crate) fn validate_structure(graph: &ConnectionGraph) -> GraphResult<()> {
    let mut seen: BTreeSet<PortId> = BTreeSet::new();
    for (id, element) in &graph.elements {
        for port in &element.ports {
            if !seen.insert(port.id) {
                return Err(GraphError::DuplicatePort { port: port.id });
            }
            if port.owner != *id {
                return Err(GraphError::OwnerMismatch {
                    port: port.id,
                    expected: *id,
                    actual: port.owner,
                });
            }
            match graph.port_owner.get(&port.id) {
                Some(owner) if owner == id => {}
                Some(owner) => {
                    return Err(GraphError::OwnerMismatch {
                        port: port.id,
                        expected: *id,
                        actual: *owner,
                    });
                }
                None => return Err(GraphError::UnknownPort { port: port.id }),
            }
        }
    }
    // Index must not name ports that no element holds
    if let Some(stale) = graph.port_owner.keys().find(|p| !seen.contains(p)) {
        return Err(GraphError::UnknownPort { port: *stale });
    }
    Ok(())
}

/// Every connection is mirrored, joins two distinct elements and names an
/// active port.
pub(crate) fn validate_connections(graph: &ConnectionGraph) -> GraphResult<()> {
    for element in graph.elements.values() {
        for port in &element.ports {
            let Some(partner) = port.connection else {
                continue;
            };
            let other = graph
                .port(partner)
                .map_err(|_| GraphError::UnknownPort { port: partner })?;
            if other.connection != Some(port.id) {
                return Err(GraphError::AsymmetricConnection {
                    a: port.id,
                    b: partner,
                });
            }
            if other.owner == element.id {
                return Err(GraphError::SelfLoop {
                    element: element.id,
                    port: port.id,
                });
            }
        }
    }
    Ok(())
}

/// Full consistency check, used after rewrites.
pub fn validate_graph(graph: &ConnectionGraph) -> GraphResult<()> {
    validate_structure(graph)?;
    validate_connections(graph)
}

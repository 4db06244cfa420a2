//! Atomic replacement of matched subgraphs by aggregate elements.
//!
//! A [`RewritePlan`] is built against an unchanged graph: aggregates are
//! described as drafts whose ports are addressed by [`PortRef`], and ids are
//! only handed out by [`ConnectionGraph::merge`]. The plan is validated in
//! full before the graph is touched.

use std::collections::{BTreeMap, BTreeSet};

use tp_core::{ElementId, PortId};
use tp_elements::{AttrMap, Element, ElementType, Port};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::graph::ConnectionGraph;
use crate::validate;

/// Address of a port of an aggregate that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub aggregate: usize,
    pub port: usize,
}

/// An aggregate to be inserted by a rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDraft {
    pub kind: ElementType,
    pub name: String,
    /// Elements moved into the aggregate, in this order.
    pub members: Vec<ElementId>,
    /// Original ports represented by each aggregate port. More than one
    /// original makes a fused port.
    pub ports: Vec<Vec<PortId>>,
    /// Values fixed at construction time, e.g. footprint measurements.
    pub presets: AttrMap,
}

impl AggregateDraft {
    pub fn new(kind: ElementType, name: impl Into<String>, members: Vec<ElementId>) -> Self {
        Self {
            kind,
            name: name.into(),
            members,
            ports: Vec::new(),
            presets: AttrMap::new(),
        }
    }

    pub fn with_port(mut self, originals: Vec<PortId>) -> Self {
        self.ports.push(originals);
        self
    }

    pub fn with_presets(mut self, presets: AttrMap) -> Self {
        self.presets = presets;
        self
    }
}

/// Absorbed port → aggregate port standing in for it, or `None` when the
/// port disappears with the absorbed element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplacementMapping {
    entries: BTreeMap<PortId, Option<PortRef>>,
}

impl ReplacementMapping {
    pub fn get(&self, port: PortId) -> Option<Option<PortRef>> {
        self.entries.get(&port).copied()
    }

    pub fn insert(&mut self, port: PortId, target: Option<PortRef>) {
        self.entries.insert(port, target);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortId, Option<PortRef>)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

/// Everything `merge` needs to replace matched elements.
#[derive(Debug, Clone, PartialEq)]
pub struct RewritePlan {
    pub aggregates: Vec<AggregateDraft>,
    pub mapping: ReplacementMapping,
    /// Edges that vanish with the absorbed elements.
    pub inner_connections: BTreeSet<(PortId, PortId)>,
}

impl RewritePlan {
    /// Derive the mapping and the inner connections from the drafts.
    ///
    /// Every port of every member maps to `None` unless a draft port lists
    /// it as an original. Edges running inside a single draft are inner
    /// connections.
    pub fn from_drafts(graph: &ConnectionGraph, aggregates: Vec<AggregateDraft>) -> GraphResult<Self> {
        let mut mapping = ReplacementMapping::default();
        let mut inner_connections = BTreeSet::new();
        for draft in &aggregates {
            let members: BTreeSet<ElementId> = draft.members.iter().copied().collect();
            for id in &members {
                for port in graph.element(*id)?.port_ids() {
                    mapping.insert(port, None);
                }
            }
            inner_connections.extend(graph.inner_connections(&members));
        }
        for (index, draft) in aggregates.iter().enumerate() {
            for (port_index, originals) in draft.ports.iter().enumerate() {
                for original in originals {
                    mapping.insert(
                        *original,
                        Some(PortRef {
                            aggregate: index,
                            port: port_index,
                        }),
                    );
                }
            }
        }
        Ok(Self {
            aggregates,
            mapping,
            inner_connections,
        })
    }
}

/// Ids assigned by a successful merge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// New aggregate ids, in draft order.
    pub created: Vec<ElementId>,
    pub ports: BTreeMap<PortRef, PortId>,
}

impl MergeOutcome {
    fn resolve(&self, endpoint: Endpoint) -> Option<PortId> {
        match endpoint {
            Endpoint::External(p) => Some(p),
            Endpoint::Aggregate(r) => self.ports.get(&r).copied(),
        }
    }
}

/// Edge endpoint after remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Endpoint {
    Aggregate(PortRef),
    External(PortId),
}

impl ConnectionGraph {
    /// Replace the absorbed elements of `plan` by its aggregates.
    ///
    /// The plan is checked in full before the graph is touched, so a
    /// rejected plan leaves the graph unchanged. Debug builds also check the
    /// rewritten graph against [`validate::validate_graph`] and restore the
    /// previous graph when that fails.
    pub fn merge(&mut self, plan: RewritePlan) -> GraphResult<MergeOutcome> {
        let edges = self.plan_edges(&plan)?;
        let backup = cfg!(debug_assertions).then(|| self.clone());

        let result = match self.apply(plan, &edges) {
            Ok(outcome) if backup.is_some() => validate::validate_graph(self).map(|()| outcome),
            other => other,
        };
        if result.is_err() {
            if let Some(previous) = backup {
                *self = previous;
            }
        }
        result
    }

    fn apply(&mut self, plan: RewritePlan, edges: &[(Endpoint, Endpoint)]) -> GraphResult<MergeOutcome> {
        let mut outcome = MergeOutcome::default();
        let mut drafts_members: Vec<Vec<Element>> = Vec::with_capacity(plan.aggregates.len());
        let mut original_ports: BTreeMap<PortId, Port> = BTreeMap::new();
        for draft in &plan.aggregates {
            let mut members = Vec::with_capacity(draft.members.len());
            for id in &draft.members {
                let element = self
                    .remove_element(*id)
                    .ok_or(GraphError::UnknownElement { element: *id })?;
                for port in &element.ports {
                    original_ports.insert(port.id, port.clone());
                }
                members.push(element);
            }
            drafts_members.push(members);
        }

        for (index, (draft, mut members)) in plan.aggregates.iter().zip(drafts_members).enumerate() {
            let id = self.element_ids.next_id();
            let mut element = Element::new(id, draft.kind, draft.name.clone());
            for (port_index, originals) in draft.ports.iter().enumerate() {
                let port_id = self.port_ids.next_id();
                let mut port = Port::aggregate(port_id, id, originals.clone());
                if let Some(first) = originals.first().and_then(|p| original_ports.get(p)) {
                    port.position = first.position;
                    port.flow = first.flow;
                }
                outcome.ports.insert(
                    PortRef {
                        aggregate: index,
                        port: port_index,
                    },
                    port_id,
                );
                element.ports.push(port);
            }
            for (name, value) in &draft.presets {
                element.set_attribute(*name, value.clone())?;
            }
            // Members hold no live connections once they leave the graph
            for member in &mut members {
                for port in &mut member.ports {
                    port.connection = None;
                }
            }
            element.members = members;
            outcome.created.push(id);
            self.insert_element(element);
        }

        for (a, b) in edges {
            let a = outcome.resolve(*a);
            let b = outcome.resolve(*b);
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            for (port, partner) in [(a, b), (b, a)] {
                let owner = self.owner(port)?;
                if let Some(port) = self.element_mut(owner)?.port_mut(port) {
                    port.connection = Some(partner);
                }
            }
        }

        debug!(
            created = outcome.created.len(),
            edges = edges.len(),
            "merged subgraph"
        );
        Ok(outcome)
    }

    /// Validate `plan` and compute the edges touching the new aggregates.
    fn plan_edges(&self, plan: &RewritePlan) -> GraphResult<Vec<(Endpoint, Endpoint)>> {
        let mut absorbed: BTreeSet<ElementId> = BTreeSet::new();
        let mut absorbed_ports: BTreeSet<PortId> = BTreeSet::new();
        for draft in &plan.aggregates {
            if draft.members.is_empty() || draft.ports.iter().any(Vec::is_empty) {
                return Err(GraphError::MalformedAggregate {
                    name: draft.name.clone(),
                });
            }
            let mut scratch = Element::new(ElementId::from_index(0), draft.kind, draft.name.clone());
            for (name, value) in &draft.presets {
                scratch.set_attribute(*name, value.clone())?;
            }
            for id in &draft.members {
                if !absorbed.insert(*id) {
                    return Err(GraphError::AlreadyAbsorbed { element: *id });
                }
                absorbed_ports.extend(self.element(*id)?.port_ids());
            }
        }

        for (port, target) in plan.mapping.iter() {
            if !absorbed_ports.contains(&port) {
                return Err(GraphError::InconsistentMapping {
                    port,
                    reason: "mapped port is not absorbed",
                });
            }
            if let Some(r) = target {
                let exists = plan
                    .aggregates
                    .get(r.aggregate)
                    .is_some_and(|d| r.port < d.ports.len());
                if !exists {
                    return Err(GraphError::InconsistentMapping {
                        port,
                        reason: "target aggregate port does not exist",
                    });
                }
            }
        }
        for draft in &plan.aggregates {
            for original in draft.ports.iter().flatten() {
                if !absorbed_ports.contains(original) {
                    return Err(GraphError::InconsistentMapping {
                        port: *original,
                        reason: "aggregate port stands for a port that is not absorbed",
                    });
                }
            }
        }

        let target = |port: PortId| -> GraphResult<Option<PortRef>> {
            plan.mapping.get(port).ok_or(GraphError::InconsistentMapping {
                port,
                reason: "absorbed port missing from mapping",
            })
        };

        for (a, b) in &plan.inner_connections {
            if self.connected_port(*a) != Some(*b) {
                return Err(GraphError::InconsistentMapping {
                    port: *a,
                    reason: "inner connection is not an edge",
                });
            }
            if !absorbed_ports.contains(a) || !absorbed_ports.contains(b) {
                return Err(GraphError::InconsistentMapping {
                    port: *a,
                    reason: "inner connection leaves the absorbed set",
                });
            }
            if target(*a)?.is_some() || target(*b)?.is_some() {
                return Err(GraphError::InconsistentMapping {
                    port: *a,
                    reason: "inner connection endpoint is also replaced",
                });
            }
        }

        let mut edges: BTreeSet<(Endpoint, Endpoint)> = BTreeSet::new();
        for port in &absorbed_ports {
            let mapped = target(*port)?;
            let Some(partner) = self.connected_port(*port) else {
                continue;
            };
            let key = if port < &partner {
                (*port, partner)
            } else {
                (partner, *port)
            };
            if plan.inner_connections.contains(&key) {
                continue;
            }
            let Some(new_port) = mapped else {
                return Err(GraphError::InconsistentMapping {
                    port: *port,
                    reason: "connected port has no replacement",
                });
            };
            let other = if absorbed_ports.contains(&partner) {
                match target(partner)? {
                    Some(r) => Endpoint::Aggregate(r),
                    None => {
                        return Err(GraphError::InconsistentMapping {
                            port: partner,
                            reason: "connected port has no replacement",
                        });
                    }
                }
            } else {
                Endpoint::External(partner)
            };
            let this = Endpoint::Aggregate(new_port);
            if let Endpoint::Aggregate(r) = other {
                if r.aggregate == new_port.aggregate {
                    return Err(GraphError::SelfLoop {
                        element: plan.aggregates[r.aggregate].members[0],
                        port: *port,
                    });
                }
            }
            edges.insert(if this < other { (this, other) } else { (other, this) });
        }

        // Fused ports collapse identical edges; anything else sharing an
        // endpoint would give a port two connections.
        let mut used: BTreeSet<Endpoint> = BTreeSet::new();
        for (a, b) in &edges {
            for endpoint in [a, b] {
                if !used.insert(*endpoint) {
                    let port = match endpoint {
                        Endpoint::External(p) => *p,
                        Endpoint::Aggregate(r) => plan.aggregates[r.aggregate].ports[r.port][0],
                    };
                    return Err(GraphError::FusionConflict { port });
                }
            }
        }
        Ok(edges.into_iter().collect())
    }
}

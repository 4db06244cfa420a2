//! Junction merge: clusters of fittings, directly adjacent or linked by
//! pipes.

use std::collections::BTreeSet;

use tp_core::{ElementId, PortId};
use tp_elements::ElementType;
use tp_graph::{AggregateDraft, ConnectionGraph, RewritePlan};

use crate::error::SkipReason;
use crate::rule::{AggregationRule, Match, absorb_all};

const NAME: &str = "AggregatedPipeFitting";

/// Pipe-like elements that may link two fittings of one junction.
pub const JUNCTION_LINKS: [ElementType; 2] = [ElementType::Pipe, ElementType::PipeStrand];

/// Merges `PipeFitting`s that touch each other, or are linked only by pipes,
/// into one `AggregatedPipeFitting`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatedPipeFittingRule;

impl AggregationRule for AggregatedPipeFittingRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> ElementType {
        ElementType::AggregatedPipeFitting
    }

    fn find_matches(&self, graph: &ConnectionGraph) -> Vec<Match> {
        graph
            .get_connections_between(&[ElementType::PipeFitting], &JUNCTION_LINKS)
            .into_iter()
            .map(|cluster| Match::new(graph.subgraph(cluster)))
            .collect()
    }

    fn build(
        &self,
        graph: &ConnectionGraph,
        name: &str,
        matched: &Match,
    ) -> Result<RewritePlan, SkipReason> {
        let mut fittings = 0usize;
        for id in matched.nodes() {
            let element = graph.element(*id)?;
            match element.kind {
                ElementType::PipeFitting => fittings += 1,
                kind if JUNCTION_LINKS.contains(&kind) => {
                    if graph.degree(*id) > 2 {
                        return Err(SkipReason::structural(
                            NAME,
                            format!("link '{}' branches off", element.name),
                        ));
                    }
                }
                kind => {
                    return Err(SkipReason::structural(
                        NAME,
                        format!("'{}' is a {kind}, not a fitting or pipe", element.name),
                    ));
                }
            }
        }
        if fittings < 2 {
            return Err(SkipReason::structural(NAME, "fewer than two fittings"));
        }
        if !graph.subgraph(matched.nodes().iter().copied()).is_connected() {
            return Err(SkipReason::structural(NAME, "fittings are not connected"));
        }
        absorb_all(
            graph,
            ElementType::AggregatedPipeFitting,
            name,
            matched.nodes(),
            Default::default(),
        )
    }
}

/// Junction aggregate in subset mode.
///
/// Boundary ports of `nodes` facing `combined` are fused into the first
/// aggregate port; every other boundary port is exposed on its own.
pub(crate) fn subset_draft(
    graph: &ConnectionGraph,
    name: String,
    nodes: &BTreeSet<ElementId>,
    combined: &BTreeSet<ElementId>,
) -> Result<AggregateDraft, SkipReason> {
    let mut fused: Vec<PortId> = Vec::new();
    let mut single: Vec<PortId> = Vec::new();
    for port in graph.external_ports(nodes) {
        let partner_owner = graph
            .connected_port(port)
            .map(|p| graph.owner(p))
            .transpose()?;
        if partner_owner.is_some_and(|owner| combined.contains(&owner)) {
            fused.push(port);
        } else {
            single.push(port);
        }
    }
    if fused.is_empty() {
        return Err(SkipReason::structural(NAME, "junction does not face the combined elements"));
    }
    let mut draft = AggregateDraft::new(
        ElementType::AggregatedPipeFitting,
        name,
        nodes.iter().copied().collect(),
    )
    .with_port(fused);
    for port in single {
        draft = draft.with_port(vec![port]);
    }
    Ok(draft)
}

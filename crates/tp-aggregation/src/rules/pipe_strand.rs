//! Straight runs of pipes and fittings.

use std::collections::BTreeSet;

use tp_core::ElementId;
use tp_elements::{AttrMap, AttributeName, ElementType};
use tp_graph::{ConnectionGraph, RewritePlan};

use crate::error::SkipReason;
use crate::rule::{AggregationRule, Match, MatchMeta, absorb_all, preview};

/// Element types a straight run may consist of.
pub const STRAIGHT_RUN: [ElementType; 3] = [
    ElementType::Pipe,
    ElementType::PipeFitting,
    ElementType::PipeStrand,
];

const NAME: &str = "PipeStrand";

/// Replaces chains of two or more pipe-like elements by one `PipeStrand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeStrandRule;

impl AggregationRule for PipeStrandRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> ElementType {
        ElementType::PipeStrand
    }

    fn find_matches(&self, graph: &ConnectionGraph) -> Vec<Match> {
        graph
            .get_type_chains(&STRAIGHT_RUN, false)
            .into_iter()
            .map(|chain| {
                let subgraph = graph.subgraph(chain.iter().copied());
                let values = preview(
                    graph,
                    ElementType::PipeStrand,
                    subgraph.nodes(),
                    &[AttributeName::Length, AttributeName::Diameter],
                );
                Match::new(subgraph).with_meta(MatchMeta {
                    values,
                    chain,
                    parallel: None,
                })
            })
            .collect()
    }

    fn build(
        &self,
        graph: &ConnectionGraph,
        name: &str,
        matched: &Match,
    ) -> Result<RewritePlan, SkipReason> {
        check_straight_run(graph, NAME, matched.nodes())?;
        absorb_all(
            graph,
            ElementType::PipeStrand,
            name,
            matched.nodes(),
            AttrMap::new(),
        )
    }
}

/// Members are straight-run types with at most two connected ports, form a
/// simple path and leave at most two boundary ports. Open ports vanish with
/// the run.
pub(crate) fn check_straight_run(
    graph: &ConnectionGraph,
    rule: &'static str,
    nodes: &BTreeSet<ElementId>,
) -> Result<(), SkipReason> {
    for id in nodes {
        let element = graph.element(*id)?;
        if !STRAIGHT_RUN.contains(&element.kind) {
            return Err(SkipReason::structural(
                rule,
                format!("'{}' is a {}, not a straight-run element", element.name, element.kind),
            ));
        }
        let connected = element.ports.iter().filter(|p| p.is_connected()).count();
        if connected > 2 {
            return Err(SkipReason::structural(
                rule,
                format!("'{}' has {connected} connected ports", element.name),
            ));
        }
    }
    if !graph.subgraph(nodes.iter().copied()).is_simple_path() {
        return Err(SkipReason::structural(rule, "members do not form a simple path"));
    }
    let boundary = graph.external_ports(nodes).len();
    if boundary > 2 {
        return Err(SkipReason::structural(
            rule,
            format!("{boundary} boundary ports, at most 2 expected"),
        ));
    }
    Ok(())
}

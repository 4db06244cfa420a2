//! Banks of pumps running in parallel.

use std::collections::BTreeSet;

use tp_core::{ElementId, PortId};
use tp_elements::{AttrMap, AttributeName, ElementType};
use tp_graph::{AggregateDraft, ConnectionGraph, Parallel, RewritePlan};

use crate::error::SkipReason;
use crate::rule::{AggregationRule, Match, MatchMeta, absorb_all, preview};
use crate::rules::junction::subset_draft;

const NAME: &str = "ParallelPump";

/// Types a pump branch may pass through besides pumps.
pub const BRANCH_INERT: [ElementType; 5] = [
    ElementType::Pipe,
    ElementType::PipeFitting,
    ElementType::PipeStrand,
    ElementType::Valve,
    ElementType::AggregatedPipeFitting,
];

/// Replaces pumps of similar rated power between the same junctions by one
/// `ParallelPump`.
#[derive(Debug, Clone)]
pub struct ParallelPumpRule {
    /// Grouping tolerance on rated power (kW).
    pub threshold: f64,
}

impl Default for ParallelPumpRule {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl ParallelPumpRule {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Junction fallback: the bank keeps the branches only, each side
    /// becomes a junction aggregate and the two meet through fused ports.
    fn split_sides(
        &self,
        graph: &ConnectionGraph,
        name: &str,
        parallel: &Parallel,
    ) -> Result<RewritePlan, SkipReason> {
        let branch_nodes: BTreeSet<ElementId> = parallel.branches.iter().flatten().copied().collect();
        let sides: Vec<BTreeSet<ElementId>> = parallel
            .sides
            .iter()
            .map(|s| s.nodes.iter().copied().collect())
            .collect();
        for id in sides.iter().flatten() {
            graph.element(*id)?;
        }

        let mut facing: [Vec<PortId>; 2] = [Vec::new(), Vec::new()];
        for port in graph.external_ports(&branch_nodes) {
            let owner = graph
                .connected_port(port)
                .map(|p| graph.owner(p))
                .transpose()?;
            match sides.iter().position(|s| owner.is_some_and(|o| s.contains(&o))) {
                Some(index) => facing[index].push(port),
                None => {
                    return Err(SkipReason::structural(
                        NAME,
                        "branch connects to something other than its two sides",
                    ));
                }
            }
        }
        if facing.iter().any(Vec::is_empty) {
            return Err(SkipReason::structural(NAME, "a side faces no branch"));
        }

        let [to_a, to_b] = facing;
        let bank = AggregateDraft::new(
            ElementType::ParallelPump,
            name,
            branch_nodes.iter().copied().collect(),
        )
        .with_port(to_a)
        .with_port(to_b);
        let mut drafts = vec![bank];
        for (index, side) in sides.iter().enumerate() {
            drafts.push(subset_draft(
                graph,
                format!("{name} junction {}", index + 1),
                side,
                &branch_nodes,
            )?);
        }
        Ok(RewritePlan::from_drafts(graph, drafts)?)
    }
}

impl AggregationRule for ParallelPumpRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> ElementType {
        ElementType::ParallelPump
    }

    fn find_matches(&self, graph: &ConnectionGraph) -> Vec<Match> {
        graph
            .get_parallels(
                &[ElementType::Pump],
                &BRANCH_INERT,
                &[AttributeName::RatedPower],
                self.threshold,
            )
            .into_iter()
            .map(|parallel| {
                let subgraph = graph.subgraph(parallel.nodes());
                let pumps: BTreeSet<ElementId> = parallel.branches.iter().flatten().copied().collect();
                let values = preview(
                    graph,
                    ElementType::ParallelPump,
                    &pumps,
                    &[
                        AttributeName::RatedPower,
                        AttributeName::RatedHeight,
                        AttributeName::RatedVolumeFlow,
                    ],
                );
                Match::new(subgraph).with_meta(MatchMeta {
                    values,
                    chain: Vec::new(),
                    parallel: Some(parallel),
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
        let Some(parallel) = &matched.meta.parallel else {
            return Err(SkipReason::structural(NAME, "match carries no branch layout"));
        };
        if parallel.branches.len() < 2 {
            return Err(SkipReason::structural(NAME, "fewer than two branches"));
        }
        let boundary = graph.external_ports(matched.nodes()).len();
        match boundary {
            2 => absorb_all(graph, ElementType::ParallelPump, name, matched.nodes(), AttrMap::new()),
            0 | 1 => Err(SkipReason::structural(
                NAME,
                format!("{boundary} boundary ports, a bank needs two"),
            )),
            _ => self.split_sides(graph, name, parallel),
        }
    }
}

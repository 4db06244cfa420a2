//! The reduction driver: runs the enabled rules over a graph in order.

use std::collections::BTreeSet;

use tp_core::ElementId;
use tp_graph::ConnectionGraph;
use tracing::{debug, info, warn};

use crate::error::{ReduceError, ReduceResult};
use crate::options::ReduceOptions;
use crate::rule::AggregationRule;
use crate::rules::registry;

/// Outcome of one rule over all of its passes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleReport {
    pub rule: &'static str,
    pub created: usize,
    pub skipped: usize,
    pub stale: usize,
    pub passes: usize,
}

/// Summary of a reduction run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReduceReport {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub rules: Vec<RuleReport>,
}

impl ReduceReport {
    pub fn created(&self) -> usize {
        self.rules.iter().map(|r| r.created).sum()
    }
}

/// Run every enabled rule on `graph`.
///
/// Skipped matches are logged and counted; a failing rewrite aborts the run
/// with the graph in its state before that rewrite.
pub fn reduce(graph: &mut ConnectionGraph, options: &ReduceOptions) -> ReduceResult<ReduceReport> {
    if options.max_passes == 0 {
        return Err(ReduceError::InvalidArg {
            what: "max_passes must be at least 1",
        });
    }
    let mut report = ReduceReport {
        nodes_before: graph.element_count(),
        ..ReduceReport::default()
    };
    for rule in registry(options) {
        report.rules.push(run_rule(graph, rule.as_ref(), options.max_passes)?);
    }
    report.nodes_after = graph.element_count();
    info!(
        before = report.nodes_before,
        after = report.nodes_after,
        "reduced graph from {} to {} elements",
        report.nodes_before,
        report.nodes_after
    );
    Ok(report)
}

/// Apply one rule until its matches stop going stale.
///
/// Matches found in one pass may overlap; once one of them is merged the
/// others are stale and the rule is tried again on the rewritten graph.
pub fn run_rule(
    graph: &mut ConnectionGraph,
    rule: &dyn AggregationRule,
    max_passes: usize,
) -> ReduceResult<RuleReport> {
    let mut report = RuleReport {
        rule: rule.name(),
        ..RuleReport::default()
    };
    let mut skipped: BTreeSet<Vec<ElementId>> = BTreeSet::new();

    for _ in 0..max_passes {
        report.passes += 1;
        let matches = rule.find_matches(graph);
        let (mut stale, mut created) = (0usize, 0usize);

        for matched in &matches {
            if matched.nodes().iter().any(|id| !graph.contains(*id)) {
                debug!(rule = rule.name(), size = matched.len(), "match went stale");
                stale += 1;
                continue;
            }
            let name = format!("{} {}", rule.name(), report.created + 1);
            match rule.build(graph, &name, matched) {
                Ok(plan) => {
                    graph.merge(plan).map_err(|source| ReduceError::Merge {
                        rule: rule.name(),
                        aggregate: name.clone(),
                        source,
                    })?;
                    report.created += 1;
                    created += 1;
                }
                Err(reason) => {
                    if skipped.insert(matched.nodes().iter().copied().collect()) {
                        warn!(rule = rule.name(), size = matched.len(), "skipped match: {reason}");
                    }
                }
            }
        }
        report.stale += stale;
        if stale == 0 || created == 0 {
            break;
        }
    }
    report.skipped = skipped.len();
    info!(
        rule = rule.name(),
        created = report.created,
        skipped = report.skipped,
        "created {} aggregates of type {}",
        report.created,
        rule.kind()
    );
    Ok(report)
}

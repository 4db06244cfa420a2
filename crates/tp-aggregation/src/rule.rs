//! The aggregation rule seam.

use std::collections::BTreeSet;

use tp_core::ElementId;
use tp_elements::{AttrMap, AttributeName, Element, ElementType};
use tp_graph::{AggregateDraft, ConnectionGraph, Parallel, RewritePlan, Subgraph};

use crate::error::SkipReason;

/// Data a rule precomputes while matching.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchMeta {
    /// Attribute values the aggregate will carry.
    pub values: AttrMap,
    /// Element order along the run, for chain-shaped matches.
    pub chain: Vec<ElementId>,
    /// Branch and side layout, for parallel matches.
    pub parallel: Option<Parallel>,
}

/// A matched subgraph together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub subgraph: Subgraph,
    pub meta: MatchMeta,
}

impl Match {
    pub fn new(subgraph: Subgraph) -> Self {
        Self {
            subgraph,
            meta: MatchMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: MatchMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn nodes(&self) -> &BTreeSet<ElementId> {
        self.subgraph.nodes()
    }

    pub fn len(&self) -> usize {
        self.subgraph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subgraph.is_empty()
    }
}

/// A pattern that can be replaced by one aggregate type.
///
/// `find_matches` is pure and deterministic. `build` validates one match
/// against the current graph and describes the rewrite; it never mutates.
pub trait AggregationRule {
    /// Rule name, also the prefix of aggregate names.
    fn name(&self) -> &'static str;

    /// Type of the aggregate the rule creates.
    fn kind(&self) -> ElementType;

    fn find_matches(&self, graph: &ConnectionGraph) -> Vec<Match>;

    fn build(
        &self,
        graph: &ConnectionGraph,
        name: &str,
        matched: &Match,
    ) -> Result<RewritePlan, SkipReason>;
}

/// Evaluate the aggregate attributes for `nodes` without touching the graph.
///
/// The elements are cloned into a detached aggregate so the schema's own
/// computations produce the values.
pub(crate) fn preview(
    graph: &ConnectionGraph,
    kind: ElementType,
    nodes: &BTreeSet<ElementId>,
    names: &[AttributeName],
) -> AttrMap {
    let mut scratch = Element::new(ElementId::from_index(0), kind, format!("{kind} preview"));
    scratch.members = nodes
        .iter()
        .filter_map(|id| graph.element(*id).ok())
        .cloned()
        .collect();
    names
        .iter()
        .filter_map(|name| scratch.get_attribute(*name).map(|v| (*name, v)))
        .collect()
}

/// One aggregate absorbing all of `nodes`, with one port per boundary port.
pub(crate) fn absorb_all(
    graph: &ConnectionGraph,
    kind: ElementType,
    name: &str,
    nodes: &BTreeSet<ElementId>,
    presets: AttrMap,
) -> Result<RewritePlan, SkipReason> {
    let mut draft = AggregateDraft::new(kind, name, nodes.iter().copied().collect()).with_presets(presets);
    for port in graph.external_ports(nodes) {
        draft = draft.with_port(vec![port]);
    }
    Ok(RewritePlan::from_drafts(graph, vec![draft])?)
}

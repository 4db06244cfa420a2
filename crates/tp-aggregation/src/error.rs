//! Error types for aggregation.

use thiserror::Error;
use tp_graph::GraphError;

/// Why a matched subgraph was not aggregated.
///
/// Skips are not failures: the driver logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The match does not have the shape the aggregate type assumes.
    #[error("{rule}: structural assumption violated: {what}")]
    StructuralAssumption { rule: &'static str, what: String },

    /// The match failed one of the rule's acceptance criteria.
    #[error("{rule}: criteria not met: {what}")]
    CriteriaNotMet { rule: &'static str, what: String },

    /// The graph rejected a query while building the plan.
    #[error("graph query failed: {0}")]
    Graph(#[from] GraphError),
}

impl SkipReason {
    pub fn structural(rule: &'static str, what: impl Into<String>) -> Self {
        SkipReason::StructuralAssumption {
            rule,
            what: what.into(),
        }
    }

    pub fn criteria(rule: &'static str, what: impl Into<String>) -> Self {
        SkipReason::CriteriaNotMet {
            rule,
            what: what.into(),
        }
    }
}

/// Fatal failures of a reduction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    /// A rewrite violated the graph invariants; the graph is left as it was
    /// before that rewrite.
    #[error("{rule}: rewrite of '{aggregate}' failed: {source}")]
    Merge {
        rule: &'static str,
        aggregate: String,
        source: GraphError,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type ReduceResult<T> = Result<T, ReduceError>;

//! tp-aggregation: rule-driven reduction of connection graphs.
//!
//! Provides:
//! - The `AggregationRule` trait (pattern finding plus plan construction)
//! - Built-in rules: pipe strands, underfloor heating, parallel pumps and
//!   junction merges
//! - `reduce`, the driver running the rules in order
//!
//! # Example
//!
//! ```
//! use tp_aggregation::{ReduceOptions, reduce};
//! use tp_elements::ElementType;
//! use tp_graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! let mut last = None;
//! for i in 0..3 {
//!     let pipe = builder.add_element(ElementType::Pipe, format!("pipe{i}"));
//!     let a = builder.add_port(pipe).unwrap();
//!     let b = builder.add_port(pipe).unwrap();
//!     if let Some(prev) = last {
//!         builder.connect(prev, a).unwrap();
//!     }
//!     last = Some(b);
//! }
//! let mut graph = builder.build().unwrap();
//!
//! let report = reduce(&mut graph, &ReduceOptions::default()).unwrap();
//! assert_eq!(report.nodes_after, 1);
//! ```

pub mod error;
pub mod options;
pub mod reduce;
pub mod rule;
pub mod rules;

pub use error::{ReduceError, ReduceResult, SkipReason};
pub use options::{ReduceOptions, RuleKind, UnderfloorCriteria};
pub use reduce::{ReduceReport, RuleReport, reduce, run_rule};
pub use rule::{AggregationRule, Match, MatchMeta};
pub use rules::{registry, rule_for};

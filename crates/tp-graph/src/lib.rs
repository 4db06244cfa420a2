//! tp-graph: connection graph of elements and its rewrite primitives.
//!
//! Provides:
//! - `GraphBuilder` for the ingestion hand-off (elements, ports, connections)
//! - `ConnectionGraph`, an arena of active elements keyed by stable ids
//! - Traversal primitives: type chains, parallel branches, junction clusters
//! - `merge`, the atomic rewrite replacing matched elements by aggregates
//!
//! # Example
//!
//! ```
//! use tp_elements::ElementType;
//! use tp_graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! let pipe = builder.add_element(ElementType::Pipe, "pipe");
//! let pump = builder.add_element(ElementType::Pump, "pump");
//! let a = builder.add_port(pipe).unwrap();
//! let b = builder.add_port(pump).unwrap();
//! builder.connect(a, b).unwrap();
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.element_count(), 2);
//! assert_eq!(graph.get_connections(), vec![(a, b)]);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod rewrite;
pub mod traversal;
pub mod validate;

// Re-exports for ergonomics
pub use builder::GraphBuilder;
pub use error::{ConnectError, GraphError, GraphResult};
pub use graph::ConnectionGraph;
pub use rewrite::{AggregateDraft, MergeOutcome, PortRef, ReplacementMapping, RewritePlan};
pub use traversal::{Parallel, Side, Subgraph};
pub use validate::validate_graph;

//! tp-core: stable foundation for topoflow.
//!
//! Contains:
//! - units (uom SI types + constructors + unit symbols)
//! - value (unit-tagged attribute values)
//! - numeric (tolerance comparisons for grouping and plane detection)
//! - ids (stable compact IDs for elements and ports)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;
pub mod value;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TpError, TpResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
pub use value::Value;

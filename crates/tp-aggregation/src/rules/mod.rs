//! Built-in aggregation rules and their registry.

pub mod junction;
pub mod parallel_pump;
pub mod pipe_strand;
pub mod underfloor;

pub use junction::AggregatedPipeFittingRule;
pub use parallel_pump::ParallelPumpRule;
pub use pipe_strand::PipeStrandRule;
pub use underfloor::{Footprint, UnderfloorHeatingRule};

use crate::options::{ReduceOptions, RuleKind};
use crate::rule::AggregationRule;

/// Instantiate one rule with its options.
pub fn rule_for(kind: RuleKind, options: &ReduceOptions) -> Box<dyn AggregationRule> {
    match kind {
        RuleKind::UnderfloorHeating => {
            Box::new(UnderfloorHeatingRule::new(options.underfloor.clone()))
        }
        RuleKind::PipeStrand => Box::new(PipeStrandRule),
        RuleKind::ParallelPump => Box::new(ParallelPumpRule::new(options.parallel_power_threshold)),
        RuleKind::AggregatedPipeFitting => Box::new(AggregatedPipeFittingRule),
    }
}

/// Enabled rules in pipeline order.
pub fn registry(options: &ReduceOptions) -> Vec<Box<dyn AggregationRule>> {
    options.rules.iter().map(|kind| rule_for(*kind, options)).collect()
}

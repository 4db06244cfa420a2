//! Reduction options.

use core::fmt;

/// The aggregation rules known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    UnderfloorHeating,
    PipeStrand,
    ParallelPump,
    AggregatedPipeFitting,
}

impl RuleKind {
    /// Default pipeline order.
    pub const ALL: [RuleKind; 4] = [
        RuleKind::UnderfloorHeating,
        RuleKind::PipeStrand,
        RuleKind::ParallelPump,
        RuleKind::AggregatedPipeFitting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleKind::UnderfloorHeating => "UnderfloorHeating",
            RuleKind::PipeStrand => "PipeStrand",
            RuleKind::ParallelPump => "ParallelPump",
            RuleKind::AggregatedPipeFitting => "AggregatedPipeFitting",
        }
    }

    /// Case-insensitive; also accepts snake_case names.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().to_ascii_lowercase() == wanted)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Acceptance criteria for underfloor heating loops.
#[derive(Debug, Clone, PartialEq)]
pub struct UnderfloorCriteria {
    /// Minimum number of elements in the run.
    pub min_members: usize,
    /// Share of port elevations that must lie on one plane.
    pub min_z_share: f64,
    /// Elevation tolerance (m), also used to classify run orientation.
    pub z_tolerance: f64,
    /// Minimum footprint (m²).
    pub min_area: f64,
    /// Open interval for the pipe spacing (m).
    pub spacing: (f64, f64),
    /// Open interval for pipe volume density (Σl · d̄ / area).
    pub density: (f64, f64),
}

impl Default for UnderfloorCriteria {
    fn default() -> Self {
        Self {
            min_members: 20,
            min_z_share: 0.8,
            z_tolerance: 1e-3,
            min_area: 1.0,
            spacing: (0.09, 0.21),
            density: (0.01, 0.09),
        }
    }
}

/// Options for a reduction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceOptions {
    /// Rules to run, in order.
    pub rules: Vec<RuleKind>,
    /// Pumps whose rated power differs by at most this much (kW) are
    /// grouped into one bank.
    pub parallel_power_threshold: f64,
    pub underfloor: UnderfloorCriteria,
    /// Passes per rule while matches keep going stale (safety limit).
    pub max_passes: usize,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            rules: RuleKind::ALL.to_vec(),
            parallel_power_threshold: 1.0,
            underfloor: UnderfloorCriteria::default(),
            max_passes: 4,
        }
    }
}

impl ReduceOptions {
    pub fn only(rules: &[RuleKind]) -> Self {
        Self {
            rules: rules.to_vec(),
            ..Self::default()
        }
    }
}

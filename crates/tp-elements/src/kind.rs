//! Element type tags.

use core::fmt;

use crate::attribute::AttributeDef;
use crate::error::{ElementError, ElementResult};
use crate::schema;

/// Type tag of an element in the topology.
///
/// The first group describes physical devices delivered by ingestion, the
/// second group the synthetic elements created by aggregation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Pipe,
    PipeFitting,
    Valve,
    Pump,
    Storage,
    Boiler,
    SpaceHeater,
    Distributor,

    PipeStrand,
    UnderfloorHeating,
    ParallelPump,
    AggregatedPipeFitting,
}

impl ElementType {
    pub const ALL: [ElementType; 12] = [
        ElementType::Pipe,
        ElementType::PipeFitting,
        ElementType::Valve,
        ElementType::Pump,
        ElementType::Storage,
        ElementType::Boiler,
        ElementType::SpaceHeater,
        ElementType::Distributor,
        ElementType::PipeStrand,
        ElementType::UnderfloorHeating,
        ElementType::ParallelPump,
        ElementType::AggregatedPipeFitting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ElementType::Pipe => "Pipe",
            ElementType::PipeFitting => "PipeFitting",
            ElementType::Valve => "Valve",
            ElementType::Pump => "Pump",
            ElementType::Storage => "Storage",
            ElementType::Boiler => "Boiler",
            ElementType::SpaceHeater => "SpaceHeater",
            ElementType::Distributor => "Distributor",
            ElementType::PipeStrand => "PipeStrand",
            ElementType::UnderfloorHeating => "UnderfloorHeating",
            ElementType::ParallelPump => "ParallelPump",
            ElementType::AggregatedPipeFitting => "AggregatedPipeFitting",
        }
    }

    pub fn parse(name: &str) -> ElementResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ElementError::UnknownType {
                name: name.to_string(),
            })
    }

    /// True for synthetic elements produced by aggregation.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            ElementType::PipeStrand
                | ElementType::UnderfloorHeating
                | ElementType::ParallelPump
                | ElementType::AggregatedPipeFitting
        )
    }

    /// Attribute slots this type answers.
    pub fn schema(self) -> &'static [AttributeDef] {
        schema::for_type(self)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

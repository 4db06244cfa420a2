//! Attribute schemas per element type and the computations behind them.

use tp_core::units::constants::{g, rho_water};
use tp_core::{Area, Length, Power, Unit, Value, VolumeRate, m, m2};
use tracing::{debug, warn};

use crate::attribute::{AttrMap, AttributeDef, AttributeName, MultiCalc, Resolver};
use crate::element::Element;
use crate::kind::ElementType;

const fn slot(
    name: AttributeName,
    description: &'static str,
    unit: Unit,
    functions: &'static [Resolver],
) -> AttributeDef {
    AttributeDef {
        name,
        description,
        unit: Some(unit),
        functions,
    }
}

/// Total length and length-weighted diameter of pipe-like members.
pub const STRAND_AVERAGE: MultiCalc = MultiCalc {
    name: "strand_average",
    outputs: &[AttributeName::Length, AttributeName::Diameter],
    compute: strand_average,
};

/// Combined hydraulic data of pumps in parallel.
pub const PARALLEL_PUMP: MultiCalc = MultiCalc {
    name: "parallel_pump",
    outputs: &[
        AttributeName::RatedPower,
        AttributeName::RatedHeight,
        AttributeName::RatedVolumeFlow,
        AttributeName::Diameter,
        AttributeName::Length,
        AttributeName::DiameterStrand,
    ],
    compute: parallel_pump,
};

static PIPE: &[AttributeDef] = &[
    slot(AttributeName::Length, "Length of the pipe", Unit::Meter, &[]),
    slot(AttributeName::Diameter, "Inner diameter", Unit::Millimeter, &[]),
];

static PIPE_FITTING: &[AttributeDef] = &[
    slot(AttributeName::Diameter, "Nominal diameter", Unit::Millimeter, &[]),
    slot(AttributeName::Length, "Flow path length", Unit::Meter, &[]),
];

static DIAMETER_ONLY: &[AttributeDef] = &[slot(
    AttributeName::Diameter,
    "Nominal diameter",
    Unit::Millimeter,
    &[],
)];

static PUMP: &[AttributeDef] = &[
    slot(
        AttributeName::RatedPower,
        "Rated power",
        Unit::Kilowatt,
        &[Resolver::Single(pump_hydraulic_power)],
    ),
    slot(AttributeName::RatedHeight, "Rated height", Unit::Meter, &[]),
    slot(
        AttributeName::RatedVolumeFlow,
        "Rated volume flow",
        Unit::CubicMeterPerHour,
        &[],
    ),
    slot(AttributeName::Diameter, "Connection diameter", Unit::Millimeter, &[]),
];

static HEAT_DEVICE: &[AttributeDef] = &[slot(
    AttributeName::RatedPower,
    "Rated thermal power",
    Unit::Kilowatt,
    &[],
)];

static PIPE_STRAND: &[AttributeDef] = &[
    slot(
        AttributeName::Length,
        "Length of aggregated pipe",
        Unit::Meter,
        &[Resolver::Multi(STRAND_AVERAGE)],
    ),
    slot(
        AttributeName::Diameter,
        "Average diameter of aggregated pipe",
        Unit::Millimeter,
        &[Resolver::Multi(STRAND_AVERAGE)],
    ),
];

static UNDERFLOOR_HEATING: &[AttributeDef] = &[
    slot(
        AttributeName::Length,
        "Length of aggregated pipe",
        Unit::Meter,
        &[Resolver::Multi(STRAND_AVERAGE)],
    ),
    slot(
        AttributeName::Diameter,
        "Average diameter of aggregated pipe",
        Unit::Millimeter,
        &[Resolver::Multi(STRAND_AVERAGE)],
    ),
    slot(AttributeName::HeatingArea, "Heating area", Unit::SquareMeter, &[]),
    slot(AttributeName::XSpacing, "Spacing in x", Unit::Meter, &[]),
    slot(AttributeName::YSpacing, "Spacing in y", Unit::Meter, &[]),
    AttributeDef {
        name: AttributeName::IsConsumer,
        description: "Element consumes heat",
        unit: None,
        functions: &[Resolver::Single(always_consumer)],
    },
];

static PARALLEL_PUMP_SCHEMA: &[AttributeDef] = &[
    slot(
        AttributeName::RatedPower,
        "Rated power",
        Unit::Kilowatt,
        &[Resolver::Multi(PARALLEL_PUMP)],
    ),
    slot(
        AttributeName::RatedHeight,
        "Rated height",
        Unit::Meter,
        &[Resolver::Multi(PARALLEL_PUMP)],
    ),
    slot(
        AttributeName::RatedVolumeFlow,
        "Rated volume flow",
        Unit::CubicMeterPerHour,
        &[Resolver::Multi(PARALLEL_PUMP)],
    ),
    slot(
        AttributeName::Diameter,
        "Hydraulic diameter",
        Unit::Millimeter,
        &[Resolver::Multi(PARALLEL_PUMP)],
    ),
    slot(
        AttributeName::Length,
        "Length of aggregated pipe elements",
        Unit::Meter,
        &[Resolver::Multi(PARALLEL_PUMP)],
    ),
    slot(
        AttributeName::DiameterStrand,
        "Average diameter of aggregated pipe elements",
        Unit::Millimeter,
        &[Resolver::Multi(PARALLEL_PUMP)],
    ),
];

static AGGREGATED_PIPE_FITTING: &[AttributeDef] = &[slot(
    AttributeName::Diameter,
    "Largest member diameter",
    Unit::Millimeter,
    &[Resolver::Single(largest_member_diameter)],
)];

pub(crate) fn for_type(kind: ElementType) -> &'static [AttributeDef] {
    match kind {
        ElementType::Pipe => PIPE,
        ElementType::PipeFitting => PIPE_FITTING,
        ElementType::Valve | ElementType::Storage | ElementType::Distributor => DIAMETER_ONLY,
        ElementType::Pump => PUMP,
        ElementType::Boiler | ElementType::SpaceHeater => HEAT_DEVICE,
        ElementType::PipeStrand => PIPE_STRAND,
        ElementType::UnderfloorHeating => UNDERFLOOR_HEATING,
        ElementType::ParallelPump => PARALLEL_PUMP_SCHEMA,
        ElementType::AggregatedPipeFitting => AGGREGATED_PIPE_FITTING,
    }
}

/// P = V̇ · H · g · ρ
pub fn hydraulic_power(flow: VolumeRate, height: Length) -> Power {
    let power: Power = flow * height * g() * rho_water();
    power
}

fn pump_hydraulic_power(pump: &Element) -> Option<Value> {
    let flow = pump.get_attribute(AttributeName::RatedVolumeFlow)?.as_volume_rate()?;
    let height = pump.get_attribute(AttributeName::RatedHeight)?.as_length()?;
    Some(Value::from(hydraulic_power(flow, height)))
}

fn always_consumer(_: &Element) -> Option<Value> {
    Some(Value::Bool(true))
}

fn largest_member_diameter(element: &Element) -> Option<Value> {
    element
        .members
        .iter()
        .filter_map(Element::diameter)
        .reduce(|a, b| if b > a { b } else { a })
        .map(Value::from)
}

/// Length and diameter of a member, skipping it when either is missing.
fn length_and_diameter(member: &Element) -> Option<(Length, Length)> {
    let length = member.length().filter(|l| l.value > 0.0)?;
    let diameter = member.diameter().filter(|d| d.value > 0.0)?;
    Some((length, diameter))
}

fn strand_average(element: &Element) -> AttrMap {
    let mut total_length = m(0.0);
    let mut diameter_times_length: Area = m2(0.0);

    for member in &element.members {
        let Some((length, diameter)) = length_and_diameter(member) else {
            warn!(
                aggregate = %element.name,
                member = %member.name,
                "Ignored member in aggregation: length or diameter missing"
            );
            continue;
        };
        let weighted: Area = diameter * length;
        diameter_times_length += weighted;
        total_length += length;
    }

    let mut result = AttrMap::new();
    result.insert(AttributeName::Length, Value::from(total_length));
    if total_length.value > 0.0 {
        let diameter: Length = diameter_times_length / total_length;
        result.insert(AttributeName::Diameter, Value::from(diameter));
    }
    result
}

fn parallel_pump(element: &Element) -> AttrMap {
    let mut total_flow: Option<VolumeRate> = None;
    let mut min_height: Option<Length> = None;
    let mut diameter_squares = 0.0_f64;
    let mut has_diameter = false;
    let mut total_length = m(0.0);
    let mut diameter_times_length: Area = m2(0.0);

    for member in &element.members {
        if member.kind == ElementType::Pump {
            let flow = member
                .get_attribute(AttributeName::RatedVolumeFlow)
                .and_then(|v| v.as_volume_rate());
            match flow {
                Some(flow) => total_flow = Some(total_flow.map_or(flow, |acc| acc + flow)),
                None => warn!(
                    aggregate = %element.name,
                    member = %member.name,
                    "Ignored pump flow in aggregation: rated_volume_flow missing"
                ),
            }

            let height = member
                .get_attribute(AttributeName::RatedHeight)
                .and_then(|v| v.as_length());
            match height {
                Some(h) => {
                    min_height = Some(match min_height {
                        Some(current) if current <= h => current,
                        _ => h,
                    })
                }
                None => warn!(
                    aggregate = %element.name,
                    member = %member.name,
                    "Ignored pump height in aggregation: rated_height missing"
                ),
            }

            match member.diameter() {
                Some(d) => {
                    diameter_squares += d.value * d.value;
                    has_diameter = true;
                }
                None => warn!(
                    aggregate = %element.name,
                    member = %member.name,
                    "Ignored pump diameter in aggregation: diameter missing"
                ),
            }
        } else if let Some((length, diameter)) = length_and_diameter(member) {
            let weighted: Area = diameter * length;
            diameter_times_length += weighted;
            total_length += length;
        } else {
            debug!(
                aggregate = %element.name,
                member = %member.name,
                "Member without length/diameter left out of strand data"
            );
        }
    }

    let mut result = AttrMap::new();
    if let (Some(flow), Some(height)) = (total_flow, min_height) {
        result.insert(
            AttributeName::RatedPower,
            Value::from(hydraulic_power(flow, height)),
        );
    }
    if let Some(flow) = total_flow {
        result.insert(AttributeName::RatedVolumeFlow, Value::from(flow));
    }
    if let Some(height) = min_height {
        result.insert(AttributeName::RatedHeight, Value::from(height));
    }
    if has_diameter {
        result.insert(
            AttributeName::Diameter,
            Value::from(m(diameter_squares.sqrt())),
        );
    }
    result.insert(AttributeName::Length, Value::from(total_length));
    if total_length.value > 0.0 {
        let diameter: Length = diameter_times_length / total_length;
        result.insert(AttributeName::DiameterStrand, Value::from(diameter));
    }
    result
}

//! Underfloor heating loops: long serpentine runs lying on one plane.

use std::collections::BTreeSet;

use nalgebra::Point3;
use tp_core::{ElementId, Unit, Value, m, m2, within};
use tp_elements::{AttrMap, AttributeName, ElementType};
use tp_graph::{ConnectionGraph, RewritePlan};
use tracing::debug;

use crate::error::SkipReason;
use crate::options::UnderfloorCriteria;
use crate::rule::{AggregationRule, Match, MatchMeta, absorb_all, preview};
use crate::rules::pipe_strand::{STRAIGHT_RUN, check_straight_run};

const NAME: &str = "UnderfloorHeating";

/// Geometry measured on a candidate run.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// Elevation of the dominant plane (m).
    pub z: f64,
    /// Share of port elevations on that plane.
    pub z_share: f64,
    /// Bounding box area of element midpoints on the plane (m²).
    pub area: f64,
    /// Distance between runs laid along y (m).
    pub x_spacing: Option<f64>,
    /// Distance between runs laid along x (m).
    pub y_spacing: Option<f64>,
}

impl Footprint {
    /// Measure the run; `None` without any port position.
    pub fn measure(graph: &ConnectionGraph, nodes: &BTreeSet<ElementId>, tolerance: f64) -> Option<Self> {
        let elements: Vec<_> = nodes.iter().filter_map(|id| graph.element(*id).ok()).collect();
        let mut zs: Vec<f64> = elements
            .iter()
            .flat_map(|e| e.ports.iter().filter_map(|p| p.position.map(|pos| pos.z)))
            .collect();
        if zs.is_empty() {
            return None;
        }
        zs.sort_by(f64::total_cmp);
        let mut best = (zs[0], 0usize);
        for z in &zs {
            let count = zs.iter().filter(|other| within(**other, *z, tolerance)).count();
            if count > best.1 {
                best = (*z, count);
            }
        }
        let (z, on_plane) = best;

        let mut midpoints: Vec<Point3<f64>> = Vec::new();
        let (mut along_x, mut along_y) = (0usize, 0usize);
        for element in &elements {
            let Some(mid) = element.position().filter(|p| within(p.z, z, tolerance)) else {
                continue;
            };
            midpoints.push(mid);
            let ends: Vec<_> = element.ports.iter().filter_map(|p| p.position).collect();
            if let [a, b] = ends.as_slice() {
                let d = b - a;
                if within(d.y, 0.0, tolerance) && !within(d.x, 0.0, tolerance) {
                    along_x += 1;
                } else if within(d.x, 0.0, tolerance) && !within(d.y, 0.0, tolerance) {
                    along_y += 1;
                }
            }
        }

        let extent = |axis: usize| -> f64 {
            let values = midpoints.iter().map(|p| p[axis]);
            let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
            let min = values.fold(f64::INFINITY, f64::min);
            if max >= min { max - min } else { 0.0 }
        };
        let (extent_x, extent_y) = (extent(0), extent(1));
        let spacing = |extent: f64, runs: usize| (runs >= 2).then(|| extent / (runs - 1) as f64);

        Some(Self {
            z,
            z_share: on_plane as f64 / zs.len() as f64,
            area: extent_x * extent_y,
            x_spacing: spacing(extent_x, along_y),
            y_spacing: spacing(extent_y, along_x),
        })
    }
}

/// Replaces qualifying serpentine runs by one `UnderfloorHeating` consumer.
#[derive(Debug, Clone, Default)]
pub struct UnderfloorHeatingRule {
    pub criteria: UnderfloorCriteria,
}

impl UnderfloorHeatingRule {
    pub fn new(criteria: UnderfloorCriteria) -> Self {
        Self { criteria }
    }

    /// Check a candidate run and compute the aggregate's values.
    ///
    /// Spacing and density bounds are exclusive.
    pub fn evaluate(
        &self,
        graph: &ConnectionGraph,
        nodes: &BTreeSet<ElementId>,
    ) -> Result<AttrMap, SkipReason> {
        let c = &self.criteria;
        let unmet = |what: String| SkipReason::criteria(NAME, what);
        if nodes.len() < c.min_members {
            return Err(unmet(format!("{} members, {} required", nodes.len(), c.min_members)));
        }
        let footprint = Footprint::measure(graph, nodes, c.z_tolerance)
            .ok_or_else(|| unmet("no port positions".to_string()))?;
        if footprint.z_share < c.min_z_share {
            return Err(unmet(format!(
                "only {:.0} % of ports on one plane",
                footprint.z_share * 100.0
            )));
        }
        if footprint.area < c.min_area {
            return Err(unmet(format!("footprint {:.2} m² too small", footprint.area)));
        }
        let inside = |v: f64, (low, high): (f64, f64)| v > low && v < high;
        let spacing_ok = [footprint.x_spacing, footprint.y_spacing]
            .into_iter()
            .flatten()
            .any(|s| inside(s, c.spacing));
        if !spacing_ok {
            return Err(unmet(format!(
                "spacing x={:?} y={:?} outside range",
                footprint.x_spacing, footprint.y_spacing
            )));
        }

        let mut values = preview(
            graph,
            ElementType::UnderfloorHeating,
            nodes,
            &[AttributeName::Length, AttributeName::Diameter],
        );
        let length = values.get(&AttributeName::Length).and_then(|v| v.magnitude_in(Unit::Meter));
        let diameter = values.get(&AttributeName::Diameter).and_then(|v| v.magnitude_in(Unit::Meter));
        let (Some(length), Some(diameter)) = (length, diameter) else {
            return Err(unmet("pipe length or diameter unknown".to_string()));
        };
        let density = length * diameter / footprint.area;
        if !inside(density, c.density) {
            return Err(unmet(format!("pipe density {density:.3} outside range")));
        }

        values.insert(AttributeName::HeatingArea, Value::from(m2(footprint.area)));
        if let Some(x) = footprint.x_spacing {
            values.insert(AttributeName::XSpacing, Value::from(m(x)));
        }
        if let Some(y) = footprint.y_spacing {
            values.insert(AttributeName::YSpacing, Value::from(m(y)));
        }
        Ok(values)
    }
}

impl AggregationRule for UnderfloorHeatingRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> ElementType {
        ElementType::UnderfloorHeating
    }

    fn find_matches(&self, graph: &ConnectionGraph) -> Vec<Match> {
        let mut matches = Vec::new();
        for chain in graph.get_type_chains(&STRAIGHT_RUN, false) {
            let subgraph = graph.subgraph(chain.iter().copied());
            match self.evaluate(graph, subgraph.nodes()) {
                Ok(values) => matches.push(Match::new(subgraph).with_meta(MatchMeta {
                    values,
                    chain,
                    parallel: None,
                })),
                Err(why) => debug!(first = %chain[0], size = chain.len(), "not underfloor heating: {why}"),
            }
        }
        matches
    }

    fn build(
        &self,
        graph: &ConnectionGraph,
        name: &str,
        matched: &Match,
    ) -> Result<RewritePlan, SkipReason> {
        check_straight_run(graph, NAME, matched.nodes())?;
        let presets: AttrMap = self
            .evaluate(graph, matched.nodes())?
            .into_iter()
            .filter(|(name, _)| {
                matches!(
                    name,
                    AttributeName::HeatingArea | AttributeName::XSpacing | AttributeName::YSpacing
                )
            })
            .collect();
        absorb_all(graph, ElementType::UnderfloorHeating, name, matched.nodes(), presets)
    }
}

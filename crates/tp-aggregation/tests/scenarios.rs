//! End-to-end reduction scenarios.

use std::collections::BTreeSet;

use nalgebra::Point3;
use proptest::prelude::*;
use tp_aggregation::rules::{
    AggregatedPipeFittingRule, Footprint, ParallelPumpRule, PipeStrandRule, UnderfloorHeatingRule,
};
use tp_aggregation::{
    AggregationRule, Match, ReduceOptions, RuleKind, SkipReason, UnderfloorCriteria, reduce, rule_for,
};
use tp_core::{ElementId, PortId, Unit, Value, kw, m, m3ph, mm};
use tp_elements::{AttrMap, AttributeName, ElementType, FlowDirection};
use tp_graph::{ConnectionGraph, GraphBuilder};

/// Small helper around the builder for two-port and n-port elements.
struct Net {
    b: GraphBuilder,
}

impl Net {
    fn new() -> Self {
        Self {
            b: GraphBuilder::new(),
        }
    }

    fn element(&mut self, kind: ElementType, name: &str, attrs: AttrMap, ports: usize) -> (ElementId, Vec<PortId>) {
        let id = self.b.add_element_with(kind, name, attrs).unwrap();
        let ports = (0..ports).map(|_| self.b.add_port(id).unwrap()).collect();
        (id, ports)
    }

    fn pipe(&mut self, name: &str, length_m: f64, diameter_mm: f64) -> (ElementId, Vec<PortId>) {
        let mut attrs = AttrMap::new();
        attrs.insert(AttributeName::Length, Value::from(m(length_m)));
        attrs.insert(AttributeName::Diameter, Value::from(mm(diameter_mm)));
        self.element(ElementType::Pipe, name, attrs, 2)
    }

    fn placed_pipe(&mut self, name: &str, a: Point3<f64>, b: Point3<f64>, diameter_mm: f64) -> (ElementId, Vec<PortId>) {
        let mut attrs = AttrMap::new();
        attrs.insert(AttributeName::Length, Value::from(m((b - a).norm())));
        attrs.insert(AttributeName::Diameter, Value::from(mm(diameter_mm)));
        let id = self.b.add_element_with(ElementType::Pipe, name, attrs).unwrap();
        let pa = self.b.add_port_with(id, Some(a), FlowDirection::Unknown).unwrap();
        let pb = self.b.add_port_with(id, Some(b), FlowDirection::Unknown).unwrap();
        (id, vec![pa, pb])
    }

    fn pump(&mut self, name: &str, power_kw: f64, height_m: f64, flow_m3ph: f64) -> (ElementId, Vec<PortId>) {
        let mut attrs = AttrMap::new();
        attrs.insert(AttributeName::RatedPower, Value::from(kw(power_kw)));
        attrs.insert(AttributeName::RatedHeight, Value::from(m(height_m)));
        attrs.insert(AttributeName::RatedVolumeFlow, Value::from(m3ph(flow_m3ph)));
        self.element(ElementType::Pump, name, attrs, 2)
    }

    fn plain(&mut self, kind: ElementType, name: &str, ports: usize) -> (ElementId, Vec<PortId>) {
        self.element(kind, name, AttrMap::new(), ports)
    }

    fn connect(&mut self, a: PortId, b: PortId) {
        self.b.connect(a, b).unwrap();
    }

    /// Connect two-port elements head to tail.
    fn chain(&mut self, elements: &[(ElementId, Vec<PortId>)]) {
        for pair in elements.windows(2) {
            self.connect(pair[0].1[1], pair[1].1[0]);
        }
    }

    fn build(self) -> ConnectionGraph {
        self.b.build().unwrap()
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn ten_pipe_strand() -> ConnectionGraph {
    let mut net = Net::new();
    let pipes: Vec<_> = (0..10).map(|i| net.pipe(&format!("pipe{i}"), 0.1, 30.0)).collect();
    net.chain(&pipes);
    net.build()
}

#[test]
fn straight_run_of_ten_pipes() {
    let mut graph = ten_pipe_strand();
    let matches = PipeStrandRule.find_matches(&graph);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].len(), 10);
    let length = matches[0].meta.values[&AttributeName::Length].magnitude_in(Unit::Millimeter);
    assert!(close(length.unwrap(), 1000.0));

    let report = reduce(&mut graph, &ReduceOptions::only(&[RuleKind::PipeStrand])).unwrap();
    assert_eq!(report.nodes_before, 10);
    assert_eq!(report.nodes_after, 1);
    let strand = graph.elements().next().unwrap();
    assert_eq!(strand.kind, ElementType::PipeStrand);
    assert_eq!(strand.name, "PipeStrand 1");
    assert!(close(strand.get_in(AttributeName::Length, Unit::Millimeter).unwrap(), 1000.0));
    assert!(close(strand.get_in(AttributeName::Diameter, Unit::Millimeter).unwrap(), 30.0));
    assert_eq!(strand.ports.len(), 2);
}

struct PumpBank {
    graph: ConnectionGraph,
    boiler: ElementId,
    radiator: ElementId,
    vessel: Option<ElementId>,
}

/// boiler → tee ⇉ two pumps ⇉ tee → radiator, optionally with an expansion
/// vessel on the supply tee.
fn pump_bank(with_vessel: bool) -> PumpBank {
    let mut net = Net::new();
    let boiler = net.plain(ElementType::Boiler, "boiler", 2);
    let supply = net.plain(ElementType::PipeFitting, "supply", if with_vessel { 4 } else { 3 });
    let p1 = net.pump("pump1", 5.0, 12.0, 8.0);
    let p2 = net.pump("pump2", 5.0, 10.0, 8.0);
    let ret = net.plain(ElementType::PipeFitting, "return", 3);
    let radiator = net.plain(ElementType::SpaceHeater, "radiator", 2);

    net.connect(boiler.1[1], supply.1[0]);
    net.connect(supply.1[1], p1.1[0]);
    net.connect(supply.1[2], p2.1[0]);
    net.connect(p1.1[1], ret.1[1]);
    net.connect(p2.1[1], ret.1[2]);
    net.connect(ret.1[0], radiator.1[0]);
    let vessel = with_vessel.then(|| {
        let vessel = net.plain(ElementType::Storage, "vessel", 1);
        net.connect(supply.1[3], vessel.1[0]);
        vessel.0
    });
    PumpBank {
        graph: net.build(),
        boiler: boiler.0,
        radiator: radiator.0,
        vessel,
    }
}

#[test]
fn two_pumps_in_parallel() {
    let mut bank = pump_bank(false);
    let matches = ParallelPumpRule::default().find_matches(&bank.graph);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].len(), 4);

    let report = reduce(&mut bank.graph, &ReduceOptions::default()).unwrap();
    assert_eq!(report.nodes_after, 3);
    let pump = bank
        .graph
        .elements()
        .find(|e| e.kind == ElementType::ParallelPump)
        .unwrap();
    assert!(close(pump.get_in(AttributeName::RatedHeight, Unit::Meter).unwrap(), 10.0));
    assert!(close(
        pump.get_in(AttributeName::RatedVolumeFlow, Unit::CubicMeterPerHour).unwrap(),
        16.0
    ));
    let expected_watts = 16.0 / 3600.0 * 10.0 * 9.81 * 1000.0;
    assert!(close(pump.get_in(AttributeName::RatedPower, Unit::Watt).unwrap(), expected_watts));
    assert_eq!(bank.graph.neighbors(pump.id), vec![bank.boiler, bank.radiator]);
}

#[test]
fn pump_bank_with_extra_branch_splits_junctions() {
    let mut bank = pump_bank(true);
    let report = reduce(&mut bank.graph, &ReduceOptions::default()).unwrap();
    assert_eq!(report.nodes_after, 6);

    let pump = bank
        .graph
        .elements()
        .find(|e| e.kind == ElementType::ParallelPump)
        .unwrap();
    assert_eq!(pump.ports.len(), 2);
    assert!(pump.ports.iter().all(|p| p.originals.len() == 2));
    let junctions = bank.graph.neighbors(pump.id);
    assert_eq!(junctions.len(), 2);
    for id in &junctions {
        assert_eq!(
            bank.graph.element(*id).unwrap().kind,
            ElementType::AggregatedPipeFitting
        );
    }
    let vessel = bank.vessel.unwrap();
    assert_eq!(bank.graph.neighbors(vessel), bank.graph.neighbors(bank.boiler));
    assert_eq!(bank.graph.get_connections().len(), 5);
    tp_graph::validate_graph(&bank.graph).unwrap();
}

#[test]
fn distributor_separates_strands() {
    let mut net = Net::new();
    let left: Vec<_> = (0..3).map(|i| net.pipe(&format!("l{i}"), 1.0, 20.0)).collect();
    let right: Vec<_> = (0..3).map(|i| net.pipe(&format!("r{i}"), 1.0, 20.0)).collect();
    let distributor = net.plain(ElementType::Distributor, "distributor", 4);
    net.chain(&left);
    net.chain(&right);
    net.connect(left[2].1[1], distributor.1[0]);
    net.connect(distributor.1[1], right[0].1[0]);
    let graph = net.build();

    let matches = PipeStrandRule.find_matches(&graph);
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|m| !m.nodes().contains(&distributor.0)));

    let everything: BTreeSet<ElementId> = graph.element_ids().collect();
    let forced = Match::new(graph.subgraph(everything));
    let err = PipeStrandRule.build(&graph, "PipeStrand 1", &forced).unwrap_err();
    assert!(matches!(err, SkipReason::StructuralAssumption { .. }));
}

/// Serpentine of ten 2 m runs along x, 150 mm apart, joined by connectors
/// along y. With `split_first` the first run consists of two pipes.
fn underfloor_grid(split_first: bool) -> ConnectionGraph {
    let mut net = Net::new();
    let mut pipes = Vec::new();
    let at = |x: f64, y: f64| Point3::new(x, y, 0.0);
    for run in 0..10 {
        let y = 0.15 * run as f64;
        let (x0, x1) = if run % 2 == 0 { (0.0, 2.0) } else { (2.0, 0.0) };
        if run == 0 && split_first {
            pipes.push(net.placed_pipe("run0a", at(x0, y), at(1.0, y), 10.0));
            pipes.push(net.placed_pipe("run0b", at(1.0, y), at(x1, y), 10.0));
        } else {
            pipes.push(net.placed_pipe(&format!("run{run}"), at(x0, y), at(x1, y), 10.0));
        }
        if run < 9 {
            pipes.push(net.placed_pipe(&format!("bend{run}"), at(x1, y), at(x1, y + 0.15), 10.0));
        }
    }
    net.chain(&pipes);
    net.build()
}

#[test]
fn underfloor_grid_of_twenty_pipes() {
    let graph = underfloor_grid(true);
    assert_eq!(graph.element_count(), 20);
    let rule = UnderfloorHeatingRule::default();
    let matches = rule.find_matches(&graph);
    assert_eq!(matches.len(), 1);

    let values = &matches[0].meta.values;
    let area = values[&AttributeName::HeatingArea].magnitude_in(Unit::SquareMeter).unwrap();
    assert!(area >= 1.0);
    assert!(close(area, 2.7));
    let spacing = values[&AttributeName::YSpacing].magnitude_in(Unit::Millimeter).unwrap();
    assert!((90.0..=210.0).contains(&spacing));
}

#[test]
fn underfloor_grid_of_nineteen_pipes_is_rejected() {
    let graph = underfloor_grid(false);
    assert_eq!(graph.element_count(), 19);
    assert!(UnderfloorHeatingRule::default().find_matches(&graph).is_empty());
}

#[test]
fn underfloor_aggregate_is_a_consumer() {
    let mut graph = underfloor_grid(true);
    reduce(&mut graph, &ReduceOptions::default()).unwrap();
    assert_eq!(graph.element_count(), 1);
    let ufh = graph.elements().next().unwrap();
    assert_eq!(ufh.kind, ElementType::UnderfloorHeating);
    assert_eq!(ufh.get_attribute(AttributeName::IsConsumer), Some(Value::Bool(true)));
    assert!(close(ufh.get_in(AttributeName::HeatingArea, Unit::SquareMeter).unwrap(), 2.7));
    assert!(close(ufh.get_in(AttributeName::Diameter, Unit::Millimeter).unwrap(), 10.0));
}

type Snapshot = (
    Vec<(String, ElementType, Vec<(AttributeName, Option<Value>)>)>,
    Vec<(String, String)>,
);

fn snapshot(graph: &ConnectionGraph) -> Snapshot {
    let elements = graph
        .elements()
        .map(|e| {
            let values = e
                .kind
                .schema()
                .iter()
                .map(|def| (def.name, e.get_attribute(def.name)))
                .collect();
            (e.name.clone(), e.kind, values)
        })
        .collect();
    let connections = graph
        .get_connections()
        .into_iter()
        .map(|(a, b)| {
            (
                graph.port_reference(a).unwrap(),
                graph.port_reference(b).unwrap(),
            )
        })
        .collect();
    (elements, connections)
}

#[test]
fn reduction_is_deterministic_and_idempotent() {
    let mut first = pump_bank(true).graph;
    let mut second = pump_bank(true).graph;
    reduce(&mut first, &ReduceOptions::default()).unwrap();
    reduce(&mut second, &ReduceOptions::default()).unwrap();
    assert_eq!(snapshot(&first), snapshot(&second));

    let before = snapshot(&first);
    let again = reduce(&mut first, &ReduceOptions::default()).unwrap();
    assert_eq!(again.created(), 0);
    assert_eq!(snapshot(&first), before);
}

#[test]
fn independent_runs_agree_on_attribute_values() {
    let mut first = underfloor_grid(true);
    let mut second = underfloor_grid(true);
    reduce(&mut first, &ReduceOptions::default()).unwrap();
    reduce(&mut second, &ReduceOptions::default()).unwrap();

    let (a, _) = snapshot(&first);
    let (b, _) = snapshot(&second);
    assert_eq!(a, b);
    let (_, _, values) = &a[0];
    let area = values
        .iter()
        .find(|(name, _)| *name == AttributeName::HeatingArea)
        .and_then(|(_, v)| v.as_ref())
        .unwrap();
    assert!(close(area.magnitude_in(Unit::SquareMeter).unwrap(), 2.7));

    let mut bank_a = pump_bank(false).graph;
    let mut bank_b = pump_bank(false).graph;
    reduce(&mut bank_a, &ReduceOptions::default()).unwrap();
    reduce(&mut bank_b, &ReduceOptions::default()).unwrap();
    let (a, _) = snapshot(&bank_a);
    let (b, _) = snapshot(&bank_b);
    assert_eq!(a, b);
    assert!(a.iter().any(|(_, kind, values)| {
        *kind == ElementType::ParallelPump
            && values
                .iter()
                .any(|(name, v)| *name == AttributeName::RatedPower && v.is_some())
    }));
}

#[test]
fn matching_twice_gives_the_same_matches() {
    let options = ReduceOptions::default();
    for graph in [ten_pipe_strand(), pump_bank(true).graph, underfloor_grid(true)] {
        for kind in RuleKind::ALL {
            let rule = rule_for(kind, &options);
            let once = rule.find_matches(&graph);
            let twice = rule.find_matches(&graph);
            assert_eq!(once, twice, "{kind} matches differ");
        }
    }
}

#[test]
fn open_fitting_port_does_not_break_a_strand() {
    let mut net = Net::new();
    let boiler = net.plain(ElementType::Boiler, "boiler", 2);
    let a = net.pipe("a", 1.0, 20.0);
    let tee = net.plain(ElementType::PipeFitting, "tee", 3);
    let b = net.pipe("b", 1.0, 20.0);
    let radiator = net.plain(ElementType::SpaceHeater, "radiator", 2);
    net.connect(boiler.1[1], a.1[0]);
    net.connect(a.1[1], tee.1[0]);
    net.connect(tee.1[1], b.1[0]);
    net.connect(b.1[1], radiator.1[0]);
    let mut graph = net.build();

    let report = reduce(&mut graph, &ReduceOptions::only(&[RuleKind::PipeStrand])).unwrap();
    assert_eq!(report.rules[0].skipped, 0);
    assert_eq!(report.nodes_after, 3);
    let strand = graph
        .elements()
        .find(|e| e.kind == ElementType::PipeStrand)
        .unwrap();
    assert_eq!(strand.leaf_count(), 3);
    assert_eq!(strand.ports.len(), 2);
    assert_eq!(graph.neighbors(strand.id), vec![boiler.0, radiator.0]);
}

/// Two tees, either touching or linked by one pipe, each feeding two valves.
fn tee_pair(linked: bool) -> (ConnectionGraph, Vec<ElementId>) {
    let mut net = Net::new();
    let left = net.plain(ElementType::PipeFitting, "left", 3);
    let right = net.plain(ElementType::PipeFitting, "right", 3);
    if linked {
        let link = net.pipe("link", 0.5, 25.0);
        net.connect(left.1[0], link.1[0]);
        net.connect(link.1[1], right.1[0]);
    } else {
        net.connect(left.1[0], right.1[0]);
    }
    let mut valves = Vec::new();
    for (i, port) in [left.1[1], left.1[2], right.1[1], right.1[2]].into_iter().enumerate() {
        let valve = net.plain(ElementType::Valve, &format!("valve{i}"), 2);
        net.connect(port, valve.1[0]);
        valves.push(valve.0);
    }
    (net.build(), valves)
}

#[test]
fn adjacent_fittings_merge_into_one_junction() {
    let (mut graph, valves) = tee_pair(false);
    let rule = AggregatedPipeFittingRule;
    let matches = rule.find_matches(&graph);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].len(), 2);

    let plan = rule.build(&graph, "AggregatedPipeFitting 1", &matches[0]).unwrap();
    let outcome = graph.merge(plan).unwrap();
    assert_eq!(graph.element_count(), 5);
    let junction = graph.element(outcome.created[0]).unwrap();
    assert_eq!(junction.ports.len(), 4);
    assert_eq!(graph.neighbors(junction.id), valves);
}

#[test]
fn fittings_linked_by_a_pipe_merge_with_the_pipe() {
    let (mut graph, valves) = tee_pair(true);
    assert_eq!(graph.element_count(), 7);
    let report = reduce(&mut graph, &ReduceOptions::default()).unwrap();
    assert_eq!(report.nodes_after, 5);
    let junction = graph
        .elements()
        .find(|e| e.kind == ElementType::AggregatedPipeFitting)
        .unwrap();
    assert_eq!(junction.leaf_count(), 3);
    assert_eq!(junction.ports.len(), 4);
    assert_eq!(graph.neighbors(junction.id), valves);
    assert!(close(junction.get_in(AttributeName::Diameter, Unit::Millimeter).unwrap(), 25.0));
}

#[test]
fn junction_match_with_a_foreign_element_is_skipped() {
    let (graph, valves) = tee_pair(false);
    let mut nodes: BTreeSet<ElementId> = AggregatedPipeFittingRule.find_matches(&graph)[0]
        .nodes()
        .clone();
    nodes.insert(valves[0]);
    let forced = Match::new(graph.subgraph(nodes));
    let err = AggregatedPipeFittingRule
        .build(&graph, "AggregatedPipeFitting 1", &forced)
        .unwrap_err();
    assert!(matches!(err, SkipReason::StructuralAssumption { .. }));
}

#[test]
fn underfloor_spacing_bounds_are_exclusive() {
    let graph = underfloor_grid(true);
    let nodes: BTreeSet<ElementId> = graph.element_ids().collect();
    let spacing = Footprint::measure(&graph, &nodes, 1e-3)
        .and_then(|f| f.y_spacing)
        .unwrap();

    let with_spacing = |low: f64, high: f64| {
        UnderfloorHeatingRule::new(UnderfloorCriteria {
            spacing: (low, high),
            ..UnderfloorCriteria::default()
        })
    };
    assert!(with_spacing(0.09, spacing).find_matches(&graph).is_empty());
    assert!(with_spacing(spacing, 0.21).find_matches(&graph).is_empty());
    assert_eq!(with_spacing(0.09, spacing + 1e-9).find_matches(&graph).len(), 1);

    let accepted = UnderfloorHeatingRule::default().find_matches(&graph);
    let err = with_spacing(0.09, spacing)
        .build(&graph, "UnderfloorHeating 1", &accepted[0])
        .unwrap_err();
    assert!(matches!(err, SkipReason::CriteriaNotMet { .. }));
}

#[test]
fn disabled_rules_do_not_run() {
    let mut graph = ten_pipe_strand();
    let report = reduce(&mut graph, &ReduceOptions::only(&[RuleKind::ParallelPump])).unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(graph.element_count(), 10);
}

proptest! {
    #[test]
    fn strand_diameter_is_length_weighted(
        pipes in prop::collection::vec((0.05f64..5.0, 10.0f64..80.0), 2..25)
    ) {
        let mut net = Net::new();
        let elements: Vec<_> = pipes
            .iter()
            .enumerate()
            .map(|(i, (l, d))| net.pipe(&format!("p{i}"), *l, *d))
            .collect();
        net.chain(&elements);
        let mut graph = net.build();
        reduce(&mut graph, &ReduceOptions::only(&[RuleKind::PipeStrand])).unwrap();

        prop_assert_eq!(graph.element_count(), 1);
        let strand = graph.elements().next().unwrap();
        let total: f64 = pipes.iter().map(|(l, _)| l).sum();
        let weighted: f64 = pipes.iter().map(|(l, d)| l * d).sum::<f64>() / total;
        let length = strand.get_in(AttributeName::Length, Unit::Meter).unwrap();
        let diameter = strand.get_in(AttributeName::Diameter, Unit::Millimeter).unwrap();
        prop_assert!((length - total).abs() < 1e-9 * total);
        prop_assert!((diameter - weighted).abs() < 1e-9 * weighted);
        prop_assert_eq!(strand.leaf_count(), pipes.len());
    }
}

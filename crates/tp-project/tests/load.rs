//! Network file loading and conversion.

use tp_aggregation::{RuleKind, reduce};
use tp_core::Unit;
use tp_elements::{AttributeName, ElementType};
use tp_project::{ProjectError, ValidationError, build_graph, parse_json, parse_yaml, reduce_options};

const STRAND: &str = r#"
version: 1
name: strand
elements:
  - id: boiler
    type: Boiler
    attributes:
      rated_power: 24
    ports:
      - { id: boiler.out }
  - id: pipe1
    type: pipe
    attributes:
      length: 2.0
      diameter: { value: 20, unit: mm }
    ports:
      - { id: pipe1.a, position: [0.0, 0.0, 0.0] }
      - { id: pipe1.b, position: [2.0, 0.0, 0.0], flow: sink }
  - id: pipe2
    type: Pipe
    attributes:
      length: 1.0
      diameter: 0.04
    ports:
      - { id: pipe2.a }
      - { id: pipe2.b }
connections:
  - { from: boiler.out, to: pipe1.a }
  - { from: pipe1.b, to: pipe2.a }
reduce:
  rules: [pipe_strand]
"#;

#[test]
fn yaml_network_builds_and_reduces() {
    let file = parse_yaml(STRAND).unwrap();
    let mut built = build_graph(&file).unwrap();
    assert_eq!(built.graph.element_count(), 3);
    assert_eq!(built.graph.get_connections().len(), 2);

    let boiler = built.graph.element(built.elements["boiler"]).unwrap();
    assert_eq!(boiler.guid, "boiler");
    assert_eq!(boiler.get_in(AttributeName::RatedPower, Unit::Kilowatt), Some(24.0));
    let pipe = built.graph.element(built.elements["pipe1"]).unwrap();
    assert_eq!(pipe.get_in(AttributeName::Diameter, Unit::Millimeter), Some(20.0));

    let options = reduce_options(file.reduce.as_ref()).unwrap();
    assert_eq!(options.rules, vec![RuleKind::PipeStrand]);
    reduce(&mut built.graph, &options).unwrap();
    assert_eq!(built.graph.element_count(), 2);
    let strand = built
        .graph
        .elements()
        .find(|e| e.kind == ElementType::PipeStrand)
        .unwrap();
    let d = strand.get_in(AttributeName::Diameter, Unit::Millimeter).unwrap();
    assert!((d - (20.0 * 2.0 + 40.0) / 3.0).abs() < 1e-9);
}

#[test]
fn json_network_parses() {
    let json = r#"{
        "version": 1,
        "name": "tiny",
        "elements": [
            { "id": "a", "type": "Valve", "ports": [ { "id": "a1" } ] },
            { "id": "b", "type": "Valve", "ports": [ { "id": "b1" } ] }
        ],
        "connections": [ { "from": "a1", "to": "b1" } ]
    }"#;
    let file = parse_json(json).unwrap();
    let built = build_graph(&file).unwrap();
    assert_eq!(built.graph.get_connections().len(), 1);
    assert_eq!(
        built.graph.port_reference(built.ports["a1"]).unwrap(),
        "a.ports[1]"
    );
}

#[test]
fn duplicate_ids_rejected() {
    let yaml = STRAND.replace("id: pipe2\n", "id: pipe1\n");
    let err = parse_yaml(&yaml).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Validation(ValidationError::DuplicateId { .. })
    ));
}

#[test]
fn unknown_port_reference_rejected() {
    let yaml = STRAND.replace("to: pipe2.a", "to: pipe9.a");
    let err = parse_yaml(&yaml).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Validation(ValidationError::MissingReference { .. })
    ));
}

#[test]
fn port_used_twice_is_a_connect_error() {
    let yaml = STRAND.replace(
        "  - { from: pipe1.b, to: pipe2.a }",
        "  - { from: pipe1.b, to: pipe2.a }\n  - { from: pipe2.a, to: pipe1.a }",
    );
    let file = parse_yaml(&yaml).unwrap();
    let err = build_graph(&file).unwrap_err();
    match err {
        ProjectError::Connect { from, to, .. } => {
            assert_eq!(from, "pipe2.a");
            assert_eq!(to, "pipe1.a");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wrong_unit_is_reported() {
    let yaml = STRAND.replace("diameter: 0.04", "diameter: { value: 4, unit: kW }");
    let file = parse_yaml(&yaml).unwrap();
    assert!(matches!(build_graph(&file), Err(ProjectError::Graph(_))));
}

#[test]
fn unknown_rule_rejected() {
    let yaml = STRAND.replace("rules: [pipe_strand]", "rules: [radiators]");
    let file = parse_yaml(&yaml).unwrap();
    assert!(reduce_options(file.reduce.as_ref()).is_err());
}

#[test]
fn aggregate_types_cannot_be_declared() {
    let yaml = STRAND.replace("type: pipe\n", "type: PipeStrand\n");
    assert!(parse_yaml(&yaml).is_err());
}

//! Property tests for aggregate attribute computations.

use proptest::prelude::*;
use tp_core::{ElementId, Unit, Value, m, m3ph};
use tp_elements::{AttrMap, AttributeName, Element, ElementType, hydraulic_power};

fn pump(index: u32, flow: f64, height: f64) -> Element {
    let mut attrs = AttrMap::new();
    attrs.insert(AttributeName::RatedVolumeFlow, Value::from(m3ph(flow)));
    attrs.insert(AttributeName::RatedHeight, Value::from(m(height)));
    Element::new(ElementId::from_index(index), ElementType::Pump, format!("pump{index}"))
        .with_attributes(attrs)
        .unwrap()
}

fn bank(members: Vec<Element>) -> Element {
    let mut agg = Element::new(ElementId::from_index(1000), ElementType::ParallelPump, "bank");
    agg.members = members;
    agg
}

proptest! {
    #[test]
    fn bank_flow_adds_up_and_height_is_the_weakest(
        pumps in prop::collection::vec((0.1f64..50.0, 1.0f64..40.0), 2..6)
    ) {
        let members = pumps
            .iter()
            .enumerate()
            .map(|(i, (flow, height))| pump(i as u32, *flow, *height))
            .collect();
        let bank = bank(members);

        let total: f64 = pumps.iter().map(|(flow, _)| flow).sum();
        let lowest = pumps.iter().map(|(_, h)| *h).fold(f64::INFINITY, f64::min);

        let flow = bank.get_in(AttributeName::RatedVolumeFlow, Unit::CubicMeterPerHour).unwrap();
        let height = bank.get_in(AttributeName::RatedHeight, Unit::Meter).unwrap();
        prop_assert!((flow - total).abs() < 1e-9 * total.max(1.0));
        prop_assert!((height - lowest).abs() < 1e-12);

        let expected = hydraulic_power(m3ph(total), m(lowest));
        let power = bank.get_in(AttributeName::RatedPower, Unit::Kilowatt).unwrap();
        prop_assert!((power - expected.value / 1000.0).abs() < 1e-9 * power.max(1.0));
    }

    #[test]
    fn diameter_is_stored_in_any_length_unit(d_mm in 5.0f64..500.0) {
        let mut attrs = AttrMap::new();
        attrs.insert(AttributeName::Diameter, Value::from(m(d_mm / 1000.0)));
        let pipe = Element::new(ElementId::from_index(0), ElementType::Pipe, "p")
            .with_attributes(attrs)
            .unwrap();
        let back = pipe.get_in(AttributeName::Diameter, Unit::Millimeter).unwrap();
        prop_assert!((back - d_mm).abs() < 1e-9 * d_mm);
    }
}

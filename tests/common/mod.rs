//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use space_logistics_sim::config::ScenarioConfig;
use space_logistics_sim::domain::{
    Body, CarrierSpec, ClassOfSupply, Edge, EdgeKind, Element, ElementId, ElementKind,
    ElementState, Environment, LocationId, Network, Node, NodeKind, Parent, Resource,
    ResourceCatalog, ResourceRef, StateType,
};
use space_logistics_sim::model::DemandModel;
use space_logistics_sim::sim::Timeline;

pub const WATER: i32 = 1;
pub const OXYGEN: i32 = 2;
pub const FOOD: i32 = 3;
pub const FILTER: i32 = 4;

/// Default scenario configuration (baseline preset).
pub fn default_config() -> ScenarioConfig {
    ScenarioConfig::baseline()
}

/// Water, oxygen, food and a spare filter.
pub fn default_catalog() -> ResourceCatalog {
    let mut catalog = ResourceCatalog::new();
    for resource in [
        Resource::continuous(WATER, "Water", ClassOfSupply::COS201).with_unit_volume(0.001),
        Resource::continuous(OXYGEN, "Oxygen", ClassOfSupply::COS203),
        Resource::continuous(FOOD, "Food", ClassOfSupply::COS2).with_packing_factor(0.2),
        Resource::item(FILTER, "Filter", ClassOfSupply::COS4011, 2.0),
    ] {
        catalog.add(resource).ok();
    }
    catalog
}

/// A lander carrying two crew from LEO to a lunar-south-pole outpost.
pub struct Outpost {
    pub network: Network,
    pub leo: LocationId,
    pub shackleton: LocationId,
    pub transfer: LocationId,
    pub lander: ElementId,
    pub crew: Vec<ElementId>,
    pub habitat: ElementId,
}

fn crew_member(name: &str) -> Element {
    Element::crew_member(1, name, 80.0).with_state(
        ElementState::new("Active", StateType::Active).with_model(DemandModel::Rated {
            rates: vec![
                (ResourceRef::Catalog(WATER), 3.0),
                (ResourceRef::Catalog(FOOD), 1.5),
            ],
        }),
    )
}

/// Default outpost network.
///
/// LEO → Shackleton transfer takes 4 days. The habitat consumes 1 kg of
/// oxygen per day; each crew member 3 kg of water and 1.5 kg of food.
pub fn default_outpost() -> Outpost {
    let mut network = Network::new();
    let leo = network
        .add_node(Node::new(
            1,
            "LEO",
            NodeKind::Orbital {
                body: Body::Earth,
                periapsis: 400.0,
                apoapsis: 400.0,
                inclination: 51.6,
            },
        ))
        .unwrap_or(LocationId(0));
    let shackleton = network
        .add_node(Node::new(
            2,
            "Shackleton",
            NodeKind::Surface {
                body: Body::Moon,
                latitude: -89.9,
                longitude: 0.0,
            },
        ))
        .unwrap_or(LocationId(0));
    let transfer = network
        .add_edge(Edge::new(
            3,
            "Lunar Transfer",
            leo,
            shackleton,
            4.0,
            EdgeKind::Space,
        ))
        .unwrap_or(LocationId(0));

    let lander = Element::new(20, "Lander", ClassOfSupply::COS9, 4000.0).with_kind(
        ElementKind::Carrier(CarrierSpec::new(800.0, 20.0, Environment::Pressurized).with_crew(4)),
    );
    let lander = network
        .add_element(lander, Parent::Location(leo))
        .unwrap_or(ElementId(0));
    let crew = ["Commander", "Pilot"]
        .iter()
        .filter_map(|name| {
            network
                .add_element(crew_member(name), Parent::Element(lander))
                .ok()
        })
        .collect();

    let habitat = Element::new(30, "Habitat", ClassOfSupply::COS8, 10000.0).with_state(
        ElementState::new("Active", StateType::Active).with_model(DemandModel::Rated {
            rates: vec![(ResourceRef::Catalog(OXYGEN), 1.0)],
        }),
    );
    let habitat = network
        .add_element(habitat, Parent::Location(shackleton))
        .unwrap_or(ElementId(0));

    Outpost {
        network,
        leo,
        shackleton,
        transfer,
        lander,
        crew,
        habitat,
    }
}

/// Default timeline: the habitat stays 14 days from day 0; the lander
/// transfers from day 0 and stays 10 days after landing.
pub fn default_timeline(outpost: &Outpost) -> Timeline {
    Timeline::new()
        .stay(outpost.shackleton, 0.0, 14.0, &[outpost.habitat])
        .transit(outpost.transfer, 0.0, &[outpost.lander])
        .stay(outpost.shackleton, 4.0, 10.0, &[outpost.lander])
}

/// A single node holding one element that consumes `rate` kg of water per
/// day, with its stay timeline of `days`.
pub fn single_node(rate: f64, days: f64) -> (Network, LocationId, ElementId, Timeline) {
    let mut network = Network::new();
    let node = network
        .add_node(Node::new(
            1,
            "Outpost",
            NodeKind::Surface {
                body: Body::Mars,
                latitude: 18.4,
                longitude: 77.5,
            },
        ))
        .unwrap_or(LocationId(0));
    let element = Element::new(10, "Habitat", ClassOfSupply::COS8, 5000.0).with_state(
        ElementState::new("Active", StateType::Active).with_model(DemandModel::Rated {
            rates: vec![(ResourceRef::Catalog(WATER), rate)],
        }),
    );
    let element = network
        .add_element(element, Parent::Location(node))
        .unwrap_or(ElementId(0));
    let timeline = Timeline::new().stay(node, 0.0, days, &[element]);
    (network, node, element, timeline)
}

//! Serializable query results over a demand report and manifest.
//!
//! Each query is independent: callers take the ones they need and serialize
//! them in whatever format suits them.

use serde::Serialize;

use crate::domain::{
    ClassOfSupply, Demand, DemandSet, ElementId, Environment, LocationId, Network,
};
use crate::manifest::{
    CarrierManifest, ContainerId, Destination, Manifest, UnpackedReason,
};
use crate::sim::{DemandReport, SupplyEdgeId};

/// Per-resource breakdown of a demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceLine {
    pub tid: i32,
    pub name: String,
    pub cos: ClassOfSupply,
    pub environment: Environment,
    pub units: String,
    pub unit_mass: f64,
    pub unit_volume: f64,
    pub amount: f64,
    pub mass: f64,
    pub volume: f64,
}

impl From<&Demand> for ResourceLine {
    fn from(d: &Demand) -> Self {
        let r = &d.resource;
        Self {
            tid: r.tid,
            name: r.name.clone(),
            cos: r.cos,
            environment: r.environment,
            units: r.units.clone(),
            unit_mass: r.unit_mass,
            unit_volume: r.unit_volume,
            amount: d.amount,
            mass: d.mass(),
            volume: d.volume(),
        }
    }
}

fn lines(set: &DemandSet) -> Vec<ResourceLine> {
    set.iter().map(ResourceLine::from).collect()
}

fn location_name(network: &Network, id: LocationId) -> String {
    network
        .location(id)
        .map_or_else(|| id.to_string(), |l| l.name().to_string())
}

/// Aggregated demand at one supply point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDemand {
    pub node: LocationId,
    pub node_name: String,
    pub time: f64,
    pub demands: Vec<ResourceLine>,
    pub total_mass: f64,
    pub total_volume: f64,
}

/// Aggregated demand on one supply edge with its cargo capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeDemand {
    pub supply_edge: SupplyEdgeId,
    pub edge_name: String,
    pub origin: LocationId,
    pub destination: LocationId,
    pub start_time: f64,
    pub end_time: f64,
    pub demands: Vec<ResourceLine>,
    pub total_mass: f64,
    pub total_volume: f64,
    pub max_cargo_mass: f64,
    pub net_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub net_cargo_volume: f64,
}

/// One unsatisfied demand record split into consumption and production.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDemand {
    pub time: f64,
    pub location: LocationId,
    pub location_name: String,
    pub element: Option<ElementId>,
    pub consumption: Vec<ResourceLine>,
    pub production: Vec<ResourceLine>,
    pub consumption_mass: f64,
    pub production_mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerLine {
    pub id: ContainerId,
    pub name: String,
    pub tid: i32,
    pub node: LocationId,
    pub time: f64,
    /// Set when the container serves demand on an edge traversal.
    pub supply_edge: Option<SupplyEdgeId>,
    pub contents: Vec<ResourceLine>,
    pub packed_mass: f64,
    pub max_cargo_mass: f64,
    pub total_mass: f64,
    pub manifested_on: Option<(SupplyEdgeId, ElementId)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierLine {
    pub supply_edge: SupplyEdgeId,
    pub carrier: ElementId,
    pub name: String,
    pub containers: Vec<ContainerId>,
    pub manifested_mass: f64,
    pub manifested_volume: f64,
    pub mass_utilization: f64,
    pub volume_utilization: f64,
}

impl From<&CarrierManifest> for CarrierLine {
    fn from(c: &CarrierManifest) -> Self {
        Self {
            supply_edge: c.edge,
            carrier: c.carrier,
            name: c.name.clone(),
            containers: c.containers.clone(),
            manifested_mass: c.manifested_mass,
            manifested_volume: c.manifested_volume,
            mass_utilization: c.mass_utilization(),
            volume_utilization: c.volume_utilization(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnpackedLine {
    pub demand: ResourceLine,
    pub reason: UnpackedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapLine {
    pub time: f64,
    pub node: LocationId,
    pub node_name: String,
    pub supply_edge: Option<SupplyEdgeId>,
    pub containers: Vec<ContainerId>,
    pub unpacked: Vec<UnpackedLine>,
}

/// A carrier loaded at the origin of its supply edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionLine {
    pub time: f64,
    pub origin: LocationId,
    pub origin_name: String,
    pub supply_edge: SupplyEdgeId,
    pub carrier: ElementId,
    pub carrier_name: String,
    pub containers: Vec<ContainerId>,
}

/// Packed containers, carrier manifests, loading actions and gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestAnalysis {
    pub containers: Vec<ContainerLine>,
    pub carriers: Vec<CarrierLine>,
    pub actions: Vec<ActionLine>,
    pub gaps: Vec<GapLine>,
}

fn edge_of(destination: Destination) -> Option<SupplyEdgeId> {
    match destination {
        Destination::Point(_) => None,
        Destination::Edge(id) => Some(id),
    }
}

/// Node-aggregated demand in supply-point order.
pub fn node_demands(report: &DemandReport, network: &Network) -> Vec<NodeDemand> {
    report
        .node_demands
        .iter()
        .map(|(point, set)| NodeDemand {
            node: point.node,
            node_name: location_name(network, point.node),
            time: point.time,
            demands: lines(set),
            total_mass: set.total_mass(),
            total_volume: set.total_volume(),
        })
        .collect()
}

/// Edge-aggregated demand in supply-edge order.
pub fn edge_demands(report: &DemandReport, network: &Network) -> Vec<EdgeDemand> {
    report
        .edge_demands
        .iter()
        .filter_map(|(id, set)| {
            let edge = report.supply_edge(*id)?;
            Some(EdgeDemand {
                supply_edge: *id,
                edge_name: location_name(network, edge.edge),
                origin: edge.origin,
                destination: edge.destination,
                start_time: edge.start_time,
                end_time: edge.end_time,
                demands: lines(set),
                total_mass: set.total_mass(),
                total_volume: set.total_volume(),
                max_cargo_mass: edge.max_cargo_mass(),
                net_cargo_mass: edge.net_cargo_mass(),
                max_cargo_volume: edge.max_cargo_volume(),
                net_cargo_volume: edge.net_cargo_volume(),
            })
        })
        .collect()
}

/// Unsatisfied raw demand in simulation order.
pub fn raw_demands(report: &DemandReport, network: &Network) -> Vec<RawDemand> {
    report
        .unsatisfied
        .iter()
        .map(|d| {
            let consumption = d.demands.consumption();
            let production = d.demands.production();
            RawDemand {
                time: d.time,
                location: d.location,
                location_name: location_name(network, d.location),
                element: d.element,
                consumption_mass: consumption.total_mass(),
                production_mass: production.total_mass(),
                consumption: lines(&consumption),
                production: lines(&production),
            }
        })
        .collect()
}

/// Flattens a manifest for reporting.
pub fn manifest_analysis(manifest: &Manifest, network: &Network) -> ManifestAnalysis {
    let containers = manifest
        .containers
        .iter()
        .map(|c| ContainerLine {
            id: c.id,
            name: c.name.clone(),
            tid: c.tid,
            node: c.node,
            time: c.time,
            supply_edge: edge_of(c.destination),
            contents: lines(&c.contents),
            packed_mass: c.packed_mass(),
            max_cargo_mass: c.max_cargo_mass,
            total_mass: c.total_mass(),
            manifested_on: c.assignment.map(|a| (a.edge, a.carrier)),
        })
        .collect();
    let gaps = manifest
        .gaps
        .iter()
        .map(|g| GapLine {
            time: g.time,
            node: g.node,
            node_name: location_name(network, g.node),
            supply_edge: edge_of(g.destination),
            containers: g.containers.clone(),
            unpacked: g
                .unpacked
                .iter()
                .map(|u| UnpackedLine {
                    demand: ResourceLine::from(&u.demand),
                    reason: u.reason,
                })
                .collect(),
        })
        .collect();
    let actions = manifest
        .actions
        .iter()
        .map(|a| ActionLine {
            time: a.time,
            origin: a.origin,
            origin_name: location_name(network, a.origin),
            supply_edge: a.supply_edge,
            carrier: a.carrier,
            carrier_name: manifest
                .carrier(a.supply_edge, a.carrier)
                .map_or_else(|| a.carrier.to_string(), |c| c.name.clone()),
            containers: a.containers.clone(),
        })
        .collect();
    ManifestAnalysis {
        containers,
        carriers: manifest.carriers.iter().map(CarrierLine::from).collect(),
        actions,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{Body, Node, NodeKind, Resource};
    use crate::sim::{SimDemand, SupplyPoint};

    #[test]
    fn raw_demand_splits_consumption_and_production() {
        let mut network = Network::new();
        let node = network
            .add_node(Node::new(
                1,
                "Shackleton",
                NodeKind::Surface {
                    body: Body::Moon,
                    latitude: -89.9,
                    longitude: 0.0,
                },
            ))
            .unwrap_or(LocationId(0));
        let water = Arc::new(Resource::continuous(1, "Water", ClassOfSupply::COS201));
        let waste = Arc::new(Resource::continuous(2, "Waste", ClassOfSupply::COS8));
        let mut demands = DemandSet::new();
        demands.add_amount(&water, 4.0);
        demands.add_amount(&waste, -1.5);
        let report = DemandReport {
            unsatisfied: vec![SimDemand {
                time: 1.0,
                location: node,
                element: None,
                demands,
            }],
            ..DemandReport::default()
        };

        let rows = raw_demands(&report, &network);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location_name, "Shackleton");
        assert_eq!(rows[0].consumption_mass, 4.0);
        assert_eq!(rows[0].production_mass, -1.5);
        assert_eq!(rows[0].production[0].name, "Waste");
    }

    #[test]
    fn node_demand_totals() {
        let network = Network::new();
        let food = Arc::new(Resource::item(3, "Ration", ClassOfSupply::COS2, 0.5));
        let mut set = DemandSet::new();
        set.add_amount(&food, 10.0);
        let mut report = DemandReport::default();
        let point = SupplyPoint {
            node: LocationId(7),
            time: 3.0,
        };
        report.node_demands.insert(point, set);

        let rows = node_demands(&report, &network);
        assert_eq!(rows[0].total_mass, 5.0);
        assert_eq!(rows[0].node_name, "7");
        assert_eq!(rows[0].demands[0].amount, 10.0);
    }
}

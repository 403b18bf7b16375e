//! Assigning packed containers to carriers on supply edges, and gap
//! detection.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ScenarioConfig;
use crate::domain::Carrier;
use crate::sim::{DemandReport, SupplyEdge};

use super::packing::Site;
use super::types::{
    Assignment, CarrierManifest, Destination, Gap, ManifestAction, PackedContainer, UnpackedDemand,
};

/// Returns `true` if `edge` delivers in time for `destination`.
///
/// Node demand may ride on any traversal arriving at its node no later than
/// the point's time; edge demand only on its own traversal.
fn reaches(edge: &SupplyEdge, destination: Destination, config: &ScenarioConfig) -> bool {
    match destination {
        Destination::Point(point) => {
            edge.destination == point.node && config.precision.time_not_after(edge.end_time, point.time)
        }
        Destination::Edge(id) => edge.id == id,
    }
}

/// Puts each container on the first carrier with room, trying edges by
/// start time, end time, then id, and carriers in declaration order.
///
/// Returns one manifest per (supply edge, carrier) pair.
pub(crate) fn manifest(
    containers: &mut [PackedContainer],
    report: &DemandReport,
    config: &ScenarioConfig,
) -> Vec<CarrierManifest> {
    let mut carriers: Vec<CarrierManifest> = report
        .supply_edges
        .iter()
        .flat_map(|e| e.carriers.iter().map(move |c| CarrierManifest::new(e.id, c)))
        .collect();

    let mut edges: Vec<&SupplyEdge> = report.supply_edges.iter().collect();
    edges.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then_with(|| a.end_time.total_cmp(&b.end_time))
            .then_with(|| a.id.cmp(&b.id))
    });

    for container in containers.iter_mut() {
        let load = container.load();
        let slot = edges
            .iter()
            .filter(|e| reaches(e, container.destination, config))
            .find_map(|e| {
                carriers
                    .iter()
                    .position(|c| c.edge == e.id && c.can_add(load, c.current(), config))
            });
        if let Some(index) = slot {
            let carrier = &mut carriers[index];
            carrier.push(container.id, load);
            container.assignment = Some(Assignment {
                edge: carrier.edge,
                carrier: carrier.carrier,
            });
            debug!(
                container = %container.id,
                edge = carrier.edge.0,
                carrier = %carrier.carrier,
                "container manifested"
            );
        }
    }
    carriers
}

/// Loading actions for every carrier that received containers, ordered by
/// departure time then supply edge. Carriers of one edge keep declaration
/// order.
pub(crate) fn actions(carriers: &[CarrierManifest], report: &DemandReport) -> Vec<ManifestAction> {
    let mut actions: Vec<ManifestAction> = carriers
        .iter()
        .filter(|c| !c.containers.is_empty())
        .filter_map(|c| {
            let edge = report.supply_edge(c.edge)?;
            Some(ManifestAction {
                time: edge.start_time,
                origin: edge.origin,
                supply_edge: c.edge,
                carrier: c.carrier,
                containers: c.containers.clone(),
            })
        })
        .collect();
    actions.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.supply_edge.cmp(&b.supply_edge))
    });
    actions
}

/// Collects unmanifested containers and unpacked demand per destination.
pub(crate) fn gaps(containers: &[PackedContainer], unpacked: Vec<(Site, UnpackedDemand)>) -> Vec<Gap> {
    fn gap_at(gaps: &mut BTreeMap<Destination, Gap>, site: Site) -> &mut Gap {
        gaps.entry(site.destination).or_insert_with(|| Gap {
            destination: site.destination,
            node: site.node,
            time: site.time,
            containers: Vec::new(),
            unpacked: Vec::new(),
        })
    }

    let mut by_destination = BTreeMap::new();
    for container in containers.iter().filter(|c| !c.is_manifested()) {
        let site = Site {
            destination: container.destination,
            node: container.node,
            time: container.time,
        };
        gap_at(&mut by_destination, site).containers.push(container.id);
    }
    for (site, demand) in unpacked {
        gap_at(&mut by_destination, site).unpacked.push(demand);
    }

    let mut gaps: Vec<Gap> = by_destination.into_values().collect();
    gaps.sort_by(|a, b| a.time.total_cmp(&b.time));
    gaps
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{ClassOfSupply, DemandSet, ElementId, Environment, LocationId, Resource};
    use crate::manifest::types::ContainerId;
    use crate::sim::{CarrierSnapshot, SupplyEdgeId, SupplyPoint};

    fn edge(id: usize, start: f64, end: f64, capacity: f64) -> SupplyEdge {
        SupplyEdge {
            id: SupplyEdgeId(id),
            edge: LocationId(10),
            origin: LocationId(1),
            destination: LocationId(2),
            start_time: start,
            end_time: end,
            carriers: vec![CarrierSnapshot {
                element: ElementId(100 + id as u64),
                name: format!("Lander {id}"),
                max_cargo_mass: capacity,
                max_cargo_volume: 10.0,
                cargo_environment: Environment::Pressurized,
                cargo_mass: 0.0,
                cargo_volume: 0.0,
            }],
        }
    }

    fn container(id: usize, time: f64, mass: f64) -> PackedContainer {
        let food = Arc::new(Resource::continuous(1, "Food", ClassOfSupply::COS2));
        let mut contents = DemandSet::new();
        contents.add_amount(&food, mass);
        let point = SupplyPoint {
            node: LocationId(2),
            time,
        };
        PackedContainer {
            id: ContainerId(id),
            tid: -1,
            name: format!("Bag {id}"),
            destination: Destination::Point(point),
            node: point.node,
            time,
            cos: ClassOfSupply::COS2,
            environment: Environment::Unpressurized,
            mass: 1.0,
            volume: 0.1,
            max_cargo_mass: 10.0,
            max_cargo_volume: 1.0,
            contents,
            assignment: None,
        }
    }

    fn report(edges: Vec<SupplyEdge>) -> DemandReport {
        DemandReport {
            supply_edges: edges,
            ..DemandReport::default()
        }
    }

    #[test]
    fn earliest_edge_with_room_is_used() {
        let report = report(vec![edge(0, 5.0, 8.0, 100.0), edge(1, 0.0, 3.0, 100.0)]);
        let mut containers = vec![container(0, 10.0, 9.0)];
        let config = ScenarioConfig::baseline();
        let carriers = manifest(&mut containers, &report, &config);
        assert_eq!(
            containers[0].assignment.map(|a| a.edge),
            Some(SupplyEdgeId(1))
        );
        assert_eq!(carriers.len(), 2);
        assert_eq!(carriers[1].containers, vec![ContainerId(0)]);
    }

    #[test]
    fn late_arrivals_are_not_used() {
        let report = report(vec![edge(0, 5.0, 8.0, 100.0)]);
        let mut containers = vec![container(0, 6.0, 9.0)];
        let config = ScenarioConfig::baseline();
        let _ = manifest(&mut containers, &report, &config);
        assert!(containers[0].assignment.is_none());

        let found = gaps(&containers, Vec::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].containers, vec![ContainerId(0)]);
        assert_eq!(found[0].time, 6.0);
    }

    #[test]
    fn carrier_capacity_is_respected() {
        let report = report(vec![edge(0, 0.0, 1.0, 25.0)]);
        let mut containers = vec![container(0, 2.0, 9.0), container(1, 2.0, 9.0), container(2, 2.0, 9.0)];
        let config = ScenarioConfig::baseline();
        let carriers = manifest(&mut containers, &report, &config);
        assert_eq!(carriers[0].containers.len(), 2);
        assert!(carriers[0].manifested_mass <= carriers[0].max_cargo_mass);
        assert!(!containers[2].is_manifested());
    }

    #[test]
    fn edge_demand_rides_only_its_own_edge() {
        let report = report(vec![edge(0, 0.0, 1.0, 100.0), edge(1, 2.0, 3.0, 100.0)]);
        let mut c = container(0, 2.0, 1.0);
        c.destination = Destination::Edge(SupplyEdgeId(1));
        let mut containers = vec![c];
        let config = ScenarioConfig::baseline();
        let _ = manifest(&mut containers, &report, &config);
        assert_eq!(
            containers[0].assignment.map(|a| a.edge),
            Some(SupplyEdgeId(1))
        );
    }

    #[test]
    fn actions_list_loaded_carriers_by_departure() {
        let report = report(vec![edge(0, 5.0, 8.0, 100.0), edge(1, 0.0, 3.0, 100.0)]);
        let mut containers = vec![container(0, 4.0, 9.0), container(1, 9.0, 9.0)];
        let config = ScenarioConfig::baseline();
        let carriers = manifest(&mut containers, &report, &config);

        let loaded = actions(&carriers, &report);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].supply_edge, SupplyEdgeId(1));
        assert_eq!(loaded[0].time, 0.0);
        assert_eq!(loaded[0].origin, LocationId(1));
        assert_eq!(loaded[0].carrier, ElementId(101));
        assert_eq!(loaded[0].containers, vec![ContainerId(0), ContainerId(1)]);
        assert!(actions(&[], &report).is_empty());
    }
}

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{default_catalog, default_config, default_outpost, default_timeline};
use space_logistics_sim::domain::{ClassOfSupply, Demand, DemandSet, LocationId, Resource};
use space_logistics_sim::config::ScenarioConfig;
use space_logistics_sim::error::LogisticsError;
use space_logistics_sim::manifest::{
    ContainerCatalog, ContainerId, ContainerType, Destination, Manifest, ManifestEngine,
    UnpackedReason,
};
use space_logistics_sim::sim::{
    CancelToken, DemandReport, DemandSimulator, LogisticsSummary, SupplyEdgeId, SupplyPoint,
};

fn simulate() -> DemandReport {
    let outpost = default_outpost();
    let config = default_config();
    let catalog = default_catalog();
    DemandSimulator::new(&config, &catalog)
        .run(&outpost.network, &default_timeline(&outpost))
        .ok()
        .unwrap_or_default()
}

fn pack(report: &DemandReport) -> Manifest {
    pack_with(&default_config(), report)
}

fn pack_with(config: &ScenarioConfig, report: &DemandReport) -> Manifest {
    let containers = ContainerCatalog::default_factory();
    ManifestEngine::new(config, &containers)
        .run(report)
        .ok()
        .unwrap_or_default()
}

#[test]
fn overflowing_allocation_opens_a_second_container() {
    let config = default_config();
    let containers = ContainerCatalog::new().with_type(
        ContainerType::new(-1, "Bag", 1.0, 0.1)
            .with_capacity(10.0, 1.0)
            .for_classes([ClassOfSupply::COS2]),
    );
    let mut set = DemandSet::new();
    for tid in [1, 2] {
        set.add_amount(&Arc::new(Resource::continuous(tid, "Food", ClassOfSupply::COS2)), 6.0);
    }
    let mut report = DemandReport::default();
    report.node_demands.insert(
        SupplyPoint {
            node: LocationId(1),
            time: 0.0,
        },
        set,
    );

    let manifest = ManifestEngine::new(&config, &containers)
        .run(&report)
        .ok()
        .unwrap_or_default();

    assert_eq!(manifest.containers.len(), 2);
    for container in &manifest.containers {
        assert_eq!(container.packed_mass(), 6.0);
        assert!(container.packed_mass() <= container.max_cargo_mass);
    }
    // No supply edge reaches the node, so both containers are a gap.
    assert_eq!(manifest.gaps.len(), 1);
    assert_eq!(manifest.gaps[0].containers.len(), 2);
}

#[test]
fn containers_and_carriers_stay_within_capacity() {
    let manifest = pack(&simulate());
    assert!(!manifest.containers.is_empty());

    for container in &manifest.containers {
        assert!(
            container.packed_mass() <= container.max_cargo_mass + 1e-6,
            "{} holds {} of {}",
            container.name,
            container.packed_mass(),
            container.max_cargo_mass
        );
    }
    for carrier in &manifest.carriers {
        assert!(
            carrier.existing_mass + carrier.manifested_mass <= carrier.max_cargo_mass + 1e-6,
            "{} on edge {} is overloaded",
            carrier.name,
            carrier.edge.0
        );
    }
}

#[test]
fn lander_delivers_everything_after_landing() {
    let report = simulate();
    let manifest = pack(&report);

    // Only the habitat's first four days precede any arrival.
    assert_eq!(manifest.gaps.len(), 1);
    let gap = &manifest.gaps[0];
    assert_eq!(gap.time, 0.0);
    assert!(gap.unpacked.is_empty());
    assert_eq!(gap.containers.len(), 1);

    let lander = manifest.carriers.first();
    assert!(lander.is_some_and(|c| c.existing_mass > 0.0));
    assert_eq!(
        lander.map_or(0, |c| c.containers.len()),
        manifest.containers.len() - 1
    );
}

#[test]
fn lander_is_loaded_at_departure() {
    let outpost = default_outpost();
    let manifest = pack(&simulate());

    assert_eq!(manifest.actions.len(), 1);
    let action = &manifest.actions[0];
    assert_eq!(action.time, 0.0);
    assert_eq!(action.origin, outpost.leo);
    assert_eq!(action.supply_edge, SupplyEdgeId(0));
    assert_eq!(action.carrier, outpost.lander);
    let manifested: Vec<ContainerId> = manifest
        .containers
        .iter()
        .filter(|c| c.is_manifested())
        .map(|c| c.id)
        .collect();
    assert_eq!(action.containers, manifested);
}

#[test]
fn packing_overhead_is_reported_unpacked() {
    let outpost = default_outpost();
    let mut config = default_config();
    config.simulation.packing_demands = true;
    let catalog = default_catalog();
    let report = DemandSimulator::new(&config, &catalog)
        .run(&outpost.network, &default_timeline(&outpost))
        .ok()
        .unwrap_or_default();

    // Two crew eat 1.5 kg of food a day for 14 days at a packing factor of 0.2.
    let overhead: f64 = report
        .node_demands
        .values()
        .chain(report.edge_demands.values())
        .flat_map(DemandSet::iter)
        .filter(|d| d.resource.cos == ClassOfSupply::COS5)
        .map(Demand::mass)
        .sum();
    assert!((overhead - 8.4).abs() < 1e-6, "overhead = {overhead}");

    let manifest = pack_with(&config, &report);
    let unpacked: f64 = manifest
        .gaps
        .iter()
        .flat_map(|g| &g.unpacked)
        .filter(|u| u.reason == UnpackedReason::StowageOverhead)
        .map(|u| u.demand.mass())
        .sum();
    assert!((unpacked - overhead).abs() < 1e-6, "unpacked = {unpacked}");
    assert!(
        manifest
            .containers
            .iter()
            .all(|c| c.contents.iter().all(|d| d.resource.cos != ClassOfSupply::COS5))
    );
}

#[test]
fn every_shortfall_appears_in_exactly_one_gap() {
    let manifest = pack(&simulate());

    let mut seen: BTreeMap<ContainerId, usize> = BTreeMap::new();
    for gap in &manifest.gaps {
        for id in &gap.containers {
            *seen.entry(*id).or_default() += 1;
        }
    }
    let unmanifested: Vec<ContainerId> = manifest.unmanifested().map(|c| c.id).collect();
    assert_eq!(seen.len(), unmanifested.len());
    for id in unmanifested {
        assert_eq!(seen.get(&id), Some(&1), "container {id}");
    }
    for gap in &manifest.gaps {
        for id in &gap.containers {
            let destination = manifest.container(*id).map(|c| c.destination);
            assert_eq!(destination, Some(gap.destination));
        }
    }
}

#[test]
fn packed_mass_matches_aggregated_demand() {
    let report = simulate();
    let manifest = pack(&report);

    let demanded: f64 = report
        .node_demands
        .values()
        .chain(report.edge_demands.values())
        .map(DemandSet::total_mass)
        .sum();
    let packed: f64 = manifest
        .containers
        .iter()
        .map(|c| c.contents.total_mass())
        .sum();
    let unpacked: f64 = manifest
        .gaps
        .iter()
        .flat_map(|g| &g.unpacked)
        .map(|u| u.demand.mass())
        .sum();
    assert!(
        (demanded - packed - unpacked).abs() < 1e-6,
        "demanded {demanded}, packed {packed}, unpacked {unpacked}"
    );
}

#[test]
fn edge_demand_rides_its_own_traversal() {
    let manifest = pack(&simulate());
    for container in &manifest.containers {
        if let Destination::Edge(edge) = container.destination {
            assert_eq!(container.assignment.map(|a| a.edge), Some(edge));
        }
    }
}

#[test]
fn repeated_packing_is_identical() {
    let report = simulate();
    assert_eq!(pack(&report), pack(&report));
}

#[test]
fn cancelled_packing_stops() {
    let report = simulate();
    let config = default_config();
    let containers = ContainerCatalog::default_factory();
    let token = CancelToken::new();
    token.cancel();

    let result = ManifestEngine::new(&config, &containers)
        .with_cancel(token)
        .run(&report);
    assert!(matches!(result, Err(LogisticsError::Cancelled)));
}

#[test]
fn summary_agrees_with_manifest() {
    let report = simulate();
    let manifest = pack(&report);
    let summary = LogisticsSummary::from_reports(&report, &manifest);

    assert_eq!(summary.container_count, manifest.containers.len());
    assert_eq!(summary.unmanifested_count, 1);
    assert_eq!(summary.gap_count, 1);
    assert!(summary.peak_carrier_utilization > 0.0);
    assert!(summary.peak_carrier_utilization <= 1.0);
}

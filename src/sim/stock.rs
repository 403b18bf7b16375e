//! Applying demand against resource stock held in the network.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::ScenarioConfig;
use crate::domain::{
    CarrierSpec, ClassOfSupply, Demand, DemandSet, Element, ElementId, ElementKind, LocationId,
    Network, Parent, Resource, ResourceCatalog, Tank,
};

use super::types::Scavenge;

/// Elements whose stock may cover demand, in the order they are drawn on:
/// the consumer and its contents, each enclosing carrier and its
/// contents, then everything else at the location.
pub(crate) fn stock_sources(
    network: &Network,
    consumer: Option<ElementId>,
    location: LocationId,
) -> Vec<ElementId> {
    let mut order = Vec::new();
    let mut seen = BTreeSet::new();
    let mut visit = |order: &mut Vec<ElementId>, parent: Parent| {
        if let Parent::Element(id) = parent {
            if seen.insert(id) {
                order.push(id);
            }
        }
        for id in network.complete_contents_of(parent) {
            if seen.insert(id) {
                order.push(id);
            }
        }
    };

    if let Some(id) = consumer {
        visit(&mut order, Parent::Element(id));
        let mut current = id;
        while let Some(Parent::Element(up)) = network.element(current).and_then(Element::parent) {
            visit(&mut order, Parent::Element(up));
            current = up;
        }
    }
    visit(&mut order, Parent::Location(location));
    order
}

/// Draws `demands` down against the stock of every source element and
/// absorbs production into containers with spare capacity.
///
/// Whatever cannot be covered stays in `demands`.
#[expect(clippy::too_many_arguments)]
pub(crate) fn satisfy(
    network: &mut Network,
    consumer: Option<ElementId>,
    location: LocationId,
    demands: &mut DemandSet,
    catalog: &ResourceCatalog,
    config: &ScenarioConfig,
    time: f64,
    scavenged: &mut Vec<Scavenge>,
) {
    for id in stock_sources(network, consumer, location) {
        if demands.is_empty() {
            break;
        }
        let Some(element) = network.element_mut(id) else {
            continue;
        };
        if config.simulation.scavenge_spares && element.is_decommissioned() {
            scavenge(element, demands, catalog, time, scavenged);
        }
        match &mut element.kind {
            ElementKind::ResourceContainer { hold, contents } => {
                consume(
                    contents.iter_mut().map(|Demand { resource, amount }| (&**resource, amount)),
                    demands,
                );
                absorb_into_container(hold, contents, demands, config);
                contents.clean(&config.precision);
            }
            ElementKind::ResourceTank(tank) | ElementKind::PropulsiveVehicle { fuel: tank, .. } => {
                let Tank { resource, amount, .. } = &mut *tank;
                consume(std::iter::once((&**resource, amount)), demands);
                absorb_into_tank(tank, demands);
            }
            _ => {}
        }
        demands.clean(&config.precision);
    }
}

fn is_science(resource: &Resource) -> bool {
    resource.cos.is_instance_of(ClassOfSupply::COS6)
}

/// Moves mass from stock to consumption demands, matching by substitution.
fn consume<'a>(stock: impl Iterator<Item = (&'a Resource, &'a mut f64)>, demands: &mut DemandSet) {
    for (resource, available) in stock {
        if *available <= 0.0 || is_science(resource) {
            continue;
        }
        for demand in demands.iter_mut() {
            if demand.amount <= 0.0 || !resource.substitutes_for(&demand.resource) {
                continue;
            }
            let mass = (demand.amount * demand.resource.unit_mass).min(*available * resource.unit_mass);
            demand.amount -= mass / demand.resource.unit_mass;
            *available -= mass / resource.unit_mass;
            if *available <= 0.0 {
                break;
            }
        }
    }
}

fn absorb_into_container(
    hold: &CarrierSpec,
    contents: &mut DemandSet,
    demands: &mut DemandSet,
    config: &ScenarioConfig,
) {
    for demand in demands.iter_mut() {
        if demand.amount >= 0.0 || is_science(&demand.resource) {
            continue;
        }
        if config.constraints.environment_constrained
            && !demand.resource.environment.fits_in(hold.cargo_environment)
        {
            continue;
        }
        let r = &demand.resource;
        let mut units = -demand.amount;
        let spare_mass = hold.max_cargo_mass - contents.total_mass();
        units = units.min(spare_mass / r.unit_mass);
        if config.constraints.volume_constrained && r.unit_volume > 0.0 {
            let spare_volume = hold.max_cargo_volume - contents.total_volume();
            units = units.min(spare_volume / r.unit_volume);
        }
        if units > 0.0 {
            contents.add_amount(&Arc::clone(r), units);
            demand.amount += units;
        }
    }
}

fn absorb_into_tank(tank: &mut Tank, demands: &mut DemandSet) {
    if let Some(demand) = demands.get_mut(&tank.resource.key()) {
        if demand.amount < 0.0 {
            let units = (-demand.amount).min(tank.max_amount - tank.amount).max(0.0);
            tank.amount += units;
            demand.amount += units;
        }
    }
}

fn scavenge(
    element: &mut Element,
    demands: &mut DemandSet,
    catalog: &ResourceCatalog,
    time: f64,
    scavenged: &mut Vec<Scavenge>,
) {
    let source = element.uid();
    for part in element.parts.iter_mut().filter(|p| p.quantity > 0.0) {
        let Some(resource) = catalog.get(part.part) else {
            continue;
        };
        for demand in demands.iter_mut() {
            if demand.amount <= 0.0 || part.quantity <= 0.0 || !resource.substitutes_for(&demand.resource) {
                continue;
            }
            let units = (demand.amount * demand.resource.unit_mass / resource.unit_mass).min(part.quantity);
            demand.amount -= units * resource.unit_mass / demand.resource.unit_mass;
            part.quantity -= units;
            scavenged.push(Scavenge {
                time,
                source,
                part: part.part,
                amount: units,
            });
        }
    }
}

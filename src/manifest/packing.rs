//! Packing aggregated demand into containers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ScenarioConfig;
use crate::domain::{ClassOfSupply, Demand, DemandSet, Environment, Load, LocationId, Resource};
use crate::error::Result;
use crate::sim::{CancelToken, DemandReport};

use super::catalog::{ContainerCatalog, ContainerType, Stowage};
use super::types::{ContainerId, Destination, PackedContainer, UnpackedDemand, UnpackedReason};

/// Where and when a set of demand is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Site {
    pub destination: Destination,
    pub node: LocationId,
    pub time: f64,
}

/// Aggregated demand of one supply point or supply edge.
pub(crate) struct Need<'r> {
    pub site: Site,
    pub demands: &'r DemandSet,
}

/// Node and edge demand of `report` in the order it is packed: earliest
/// need first. Edge demand is needed when its traversal departs.
pub(crate) fn needs(report: &DemandReport) -> Vec<Need<'_>> {
    let mut needs: Vec<Need<'_>> = report
        .node_demands
        .iter()
        .map(|(point, demands)| Need {
            site: Site {
                destination: Destination::Point(*point),
                node: point.node,
                time: point.time,
            },
            demands,
        })
        .collect();
    for (id, demands) in &report.edge_demands {
        let Some(edge) = report.supply_edge(*id) else {
            warn!(edge = id.0, "edge demand without supply edge");
            continue;
        };
        needs.push(Need {
            site: Site {
                destination: Destination::Edge(*id),
                node: edge.origin,
                time: edge.start_time,
            },
            demands,
        });
    }
    needs.sort_by(|a, b| {
        a.site
            .time
            .total_cmp(&b.site.time)
            .then_with(|| a.site.destination.cmp(&b.site.destination))
    });
    needs
}

/// Largest amount of `resource` that fits in the spare capacity left after
/// `used`, in whole units for items.
fn fit_units(
    max_mass: f64,
    max_volume: f64,
    used: Load,
    resource: &Resource,
    config: &ScenarioConfig,
) -> f64 {
    let overhead = 1.0 + resource.packing_factor;
    let per_mass = resource.unit_mass * overhead;
    let mut units = if per_mass > 0.0 {
        (max_mass - used.mass) / per_mass
    } else {
        f64::INFINITY
    };
    let per_volume = resource.unit_volume * overhead;
    if config.constraints.volume_constrained && per_volume > 0.0 {
        units = units.min((max_volume - used.volume) / per_volume);
    }
    let units = if resource.is_item() {
        (units + 1e-9).floor()
    } else {
        let p = config.precision.demand;
        ((units / p) + 1e-9).floor() * p
    };
    units.max(0.0)
}

fn packed_load(container: &PackedContainer) -> Load {
    Load {
        mass: container.packed_mass(),
        volume: container.packed_volume(),
        environment: container.environment,
    }
}

/// Opens containers in need order and fills them first-fit.
pub(crate) struct Packer<'a> {
    config: &'a ScenarioConfig,
    catalog: &'a ContainerCatalog,
    containers: Vec<PackedContainer>,
    unpacked: Vec<(Site, UnpackedDemand)>,
}

impl<'a> Packer<'a> {
    pub(crate) fn new(config: &'a ScenarioConfig, catalog: &'a ContainerCatalog) -> Self {
        Self {
            config,
            catalog,
            containers: Vec::new(),
            unpacked: Vec::new(),
        }
    }

    /// Packs one need group by group, checking `cancel` before each group.
    ///
    /// Groups are keyed by class of supply and environment and run in key
    /// order. Production (negative amounts) is not packed. Overhead estimates
    /// are reported as unpacked.
    pub(crate) fn pack(&mut self, need: &Need<'_>, cancel: &CancelToken) -> Result<()> {
        let mut groups: BTreeMap<(ClassOfSupply, Environment), Vec<&Demand>> = BTreeMap::new();
        for demand in need.demands.iter().filter(|d| d.amount > 0.0) {
            groups
                .entry((demand.resource.cos, demand.resource.environment))
                .or_default()
                .push(demand);
        }
        for ((cos, _), demands) in groups {
            cancel.check()?;
            match self.catalog.stowage(cos) {
                Stowage::Overhead => {
                    for demand in demands {
                        debug!(cos = %cos, amount = demand.amount, "stowage estimate not packed");
                        self.unpacked.push((
                            need.site,
                            UnpackedDemand {
                                demand: demand.clone(),
                                reason: UnpackedReason::StowageOverhead,
                            },
                        ));
                    }
                }
                Stowage::Bespoke => {
                    for demand in demands {
                        self.pack_bespoke(need.site, demand);
                    }
                }
                Stowage::Container => {
                    for demand in demands {
                        self.pack_demand(need.site, demand);
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> (Vec<PackedContainer>, Vec<(Site, UnpackedDemand)>) {
        (self.containers, self.unpacked)
    }

    fn pack_bespoke(&mut self, site: Site, demand: &Demand) {
        let load = Load {
            mass: demand.packed_mass(),
            volume: demand.packed_volume(),
            environment: demand.resource.environment,
        };
        let tare = demand.mass() * demand.resource.packing_factor;
        let kind = self.catalog.bespoke(&demand.resource, load, tare);
        let id = self.open(site, &kind, &demand.resource);
        self.containers[id.0].contents.add(demand.clone());
    }

    fn pack_demand(&mut self, site: Site, demand: &Demand) {
        let resource = &demand.resource;
        let cos = resource.cos;
        let environment = resource.environment;
        let mut remaining = demand.amount;

        // the whole allocation goes into the first open container with room
        let open = self.containers.iter().position(|c| {
            c.destination == site.destination
                && c.cos == cos
                && c.environment == environment
                && fit_units(
                    c.max_cargo_mass,
                    c.max_cargo_volume,
                    packed_load(c),
                    resource,
                    self.config,
                ) + 1e-9
                    >= remaining
        });
        if let Some(index) = open {
            self.containers[index].contents.add(demand.clone());
            return;
        }

        let tolerance = self.config.precision.demand / 2.0;
        while remaining > tolerance {
            let load = Load {
                mass: remaining * resource.unit_mass * (1.0 + resource.packing_factor),
                volume: remaining * resource.unit_volume * (1.0 + resource.packing_factor),
                environment,
            };
            let Some(kind) = self.catalog.select(resource, load, self.config) else {
                self.reject(site, resource, remaining, UnpackedReason::NoContainerType);
                return;
            };
            let capacity = fit_units(
                kind.max_cargo_mass,
                kind.max_cargo_volume,
                Load::default(),
                resource,
                self.config,
            );
            let take = capacity.min(remaining);
            if take <= 0.0 {
                self.reject(site, resource, remaining, UnpackedReason::ExceedsContainer);
                return;
            }
            let kind = kind.clone();
            let id = self.open(site, &kind, resource);
            self.containers[id.0].contents.add_amount(resource, take);
            remaining -= take;
        }
    }

    fn open(&mut self, site: Site, kind: &ContainerType, resource: &Resource) -> ContainerId {
        let id = ContainerId(self.containers.len());
        let name = format!("{} {}", kind.name, id.0 + 1);
        debug!(container = %id, name = %name, node = %site.node, time = site.time, "container opened");
        self.containers.push(PackedContainer {
            id,
            tid: kind.tid,
            name,
            destination: site.destination,
            node: site.node,
            time: site.time,
            cos: resource.cos,
            environment: resource.environment,
            mass: kind.mass,
            volume: kind.volume,
            max_cargo_mass: kind.max_cargo_mass,
            max_cargo_volume: kind.max_cargo_volume,
            contents: DemandSet::new(),
            assignment: None,
        });
        id
    }

    fn reject(&mut self, site: Site, resource: &Arc<Resource>, amount: f64, reason: UnpackedReason) {
        warn!(
            resource = %resource.name,
            amount,
            node = %site.node,
            time = site.time,
            ?reason,
            "demand cannot be packed"
        );
        self.unpacked.push((
            site,
            UnpackedDemand {
                demand: Demand::new(Arc::clone(resource), amount),
                reason,
            },
        ));
    }
}

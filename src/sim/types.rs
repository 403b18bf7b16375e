//! Simulation records: demand events, supply points and supply edges.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::{DemandSet, ElementId, Environment, LocationId};

/// One simulated demand occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimDemand {
    /// Time the demand arises (days, rounded).
    pub time: f64,
    pub location: LocationId,
    /// Originating element; `None` for mission-level demand.
    pub element: Option<ElementId>,
    pub demands: DemandSet,
}

/// The node and time at which aggregated node demand is needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupplyPoint {
    pub node: LocationId,
    /// Rounded time (days).
    pub time: f64,
}

impl Eq for SupplyPoint {}

impl Ord for SupplyPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for SupplyPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Index of a supply edge in [`DemandReport::supply_edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SupplyEdgeId(pub usize);

/// Cargo state of one carrier when a supply edge departs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierSnapshot {
    pub element: ElementId,
    pub name: String,
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub cargo_environment: Environment,
    /// Cargo already aboard at departure.
    pub cargo_mass: f64,
    pub cargo_volume: f64,
}

impl CarrierSnapshot {
    /// Spare mass capacity at departure.
    pub fn net_cargo_mass(&self) -> f64 {
        self.max_cargo_mass - self.cargo_mass
    }

    pub fn net_cargo_volume(&self) -> f64 {
        self.max_cargo_volume - self.cargo_volume
    }
}

/// A scheduled traversal of a network edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyEdge {
    pub id: SupplyEdgeId,
    pub edge: LocationId,
    pub origin: LocationId,
    pub destination: LocationId,
    pub start_time: f64,
    pub end_time: f64,
    /// Carriers in declaration order, outer stacks first.
    pub carriers: Vec<CarrierSnapshot>,
}

impl SupplyEdge {
    /// The point this edge delivers to.
    pub fn arrival(&self) -> SupplyPoint {
        SupplyPoint {
            node: self.destination,
            time: self.end_time,
        }
    }

    pub fn max_cargo_mass(&self) -> f64 {
        self.carriers.iter().map(|c| c.max_cargo_mass).sum()
    }

    pub fn net_cargo_mass(&self) -> f64 {
        self.carriers.iter().map(CarrierSnapshot::net_cargo_mass).sum()
    }

    pub fn max_cargo_volume(&self) -> f64 {
        self.carriers.iter().map(|c| c.max_cargo_volume).sum()
    }

    pub fn net_cargo_volume(&self) -> f64 {
        self.carriers.iter().map(CarrierSnapshot::net_cargo_volume).sum()
    }
}

/// Why unsatisfied demand could not be attributed to a supply point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaggregatedReason {
    /// Demand on Earth's surface is supplied locally.
    EarthSurface,
    /// No supply point at the node at or before the demand time.
    NoSupplyPoint,
    /// No traversal of the edge covers the demand time.
    NoSupplyEdge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaggregatedDemand {
    pub demand: SimDemand,
    pub reason: UnaggregatedReason,
}

/// A part taken from a decommissioned element to satisfy demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scavenge {
    pub time: f64,
    pub source: ElementId,
    pub part: i32,
    pub amount: f64,
}

/// Everything the demand simulator produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemandReport {
    /// All generated demand, before stock is applied.
    pub raw: Vec<SimDemand>,
    /// Demand left after stock was applied.
    pub unsatisfied: Vec<SimDemand>,
    #[serde(skip)]
    pub node_demands: BTreeMap<SupplyPoint, DemandSet>,
    #[serde(skip)]
    pub edge_demands: BTreeMap<SupplyEdgeId, DemandSet>,
    pub supply_points: BTreeSet<SupplyPoint>,
    pub supply_edges: Vec<SupplyEdge>,
    pub unaggregated: Vec<UnaggregatedDemand>,
    pub scavenged: Vec<Scavenge>,
}

impl DemandReport {
    pub fn supply_edge(&self, id: SupplyEdgeId) -> Option<&SupplyEdge> {
        self.supply_edges.get(id.0)
    }

    /// Sum of unsatisfied demand mass.
    pub fn unsatisfied_mass(&self) -> f64 {
        self.unsatisfied.iter().map(|d| d.demands.total_mass()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(max: f64, cargo: f64) -> CarrierSnapshot {
        CarrierSnapshot {
            element: ElementId(1),
            name: "Lander".to_string(),
            max_cargo_mass: max,
            max_cargo_volume: 10.0,
            cargo_environment: Environment::Pressurized,
            cargo_mass: cargo,
            cargo_volume: 1.0,
        }
    }

    #[test]
    fn supply_points_order_by_time_then_node() {
        let a = SupplyPoint {
            node: LocationId(5),
            time: 1.0,
        };
        let b = SupplyPoint {
            node: LocationId(2),
            time: 3.0,
        };
        let c = SupplyPoint {
            node: LocationId(9),
            time: 1.0,
        };
        let set: BTreeSet<_> = [b, c, a].into_iter().collect();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![a, c, b]);
    }

    #[test]
    fn edge_capacity_sums_carriers() {
        let edge = SupplyEdge {
            id: SupplyEdgeId(0),
            edge: LocationId(3),
            origin: LocationId(1),
            destination: LocationId(2),
            start_time: 0.0,
            end_time: 3.0,
            carriers: vec![snapshot(100.0, 20.0), snapshot(50.0, 0.0)],
        };
        assert_eq!(edge.max_cargo_mass(), 150.0);
        assert_eq!(edge.net_cargo_mass(), 130.0);
        assert_eq!(edge.net_cargo_volume(), 18.0);
        assert_eq!(edge.arrival().node, LocationId(2));
    }
}

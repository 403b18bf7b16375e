//! Packing and manifesting records.

use std::fmt;

use serde::Serialize;

use crate::domain::{
    Carrier, ClassOfSupply, Demand, DemandSet, ElementId, Environment, Load, LocationId,
};
use crate::sim::{CarrierSnapshot, SupplyEdgeId, SupplyPoint};

/// Index of a container in [`Manifest::containers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerId(pub usize);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Where packed demand must be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Needed at a node by the point's time.
    Point(SupplyPoint),
    /// Consumed while traversing an edge; must ride on that traversal.
    Edge(SupplyEdgeId),
}

/// One opened container and the demand packed into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedContainer {
    pub id: ContainerId,
    pub tid: i32,
    pub name: String,
    pub destination: Destination,
    /// Node the contents are needed at.
    pub node: LocationId,
    /// Time the contents are needed by.
    pub time: f64,
    pub cos: ClassOfSupply,
    /// Environment of the contents; the carrier hold must suit it.
    pub environment: Environment,
    /// Tare mass (kg).
    pub mass: f64,
    pub volume: f64,
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub contents: DemandSet,
    /// Edge and carrier the container rides on, if manifested.
    pub assignment: Option<Assignment>,
}

impl PackedContainer {
    /// Mass of the packed demand including stowage overhead.
    pub fn packed_mass(&self) -> f64 {
        self.contents.iter().map(Demand::packed_mass).sum()
    }

    pub fn packed_volume(&self) -> f64 {
        self.contents.iter().map(Demand::packed_volume).sum()
    }

    /// Tare plus packed mass.
    pub fn total_mass(&self) -> f64 {
        self.mass + self.packed_mass()
    }

    /// What the container weighs and occupies aboard a carrier.
    pub fn load(&self) -> Load {
        Load {
            mass: self.total_mass(),
            volume: self.volume,
            environment: self.environment,
        }
    }

    pub fn is_manifested(&self) -> bool {
        self.assignment.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub edge: SupplyEdgeId,
    pub carrier: ElementId,
}

/// Containers manifested onto one carrier of one supply edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierManifest {
    pub edge: SupplyEdgeId,
    pub carrier: ElementId,
    pub name: String,
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub cargo_environment: Environment,
    /// Cargo aboard before manifesting.
    pub existing_mass: f64,
    pub existing_volume: f64,
    pub containers: Vec<ContainerId>,
    pub manifested_mass: f64,
    pub manifested_volume: f64,
}

impl CarrierManifest {
    pub(crate) fn new(edge: SupplyEdgeId, snapshot: &CarrierSnapshot) -> Self {
        Self {
            edge,
            carrier: snapshot.element,
            name: snapshot.name.clone(),
            max_cargo_mass: snapshot.max_cargo_mass,
            max_cargo_volume: snapshot.max_cargo_volume,
            cargo_environment: snapshot.cargo_environment,
            existing_mass: snapshot.cargo_mass,
            existing_volume: snapshot.cargo_volume,
            containers: Vec::new(),
            manifested_mass: 0.0,
            manifested_volume: 0.0,
        }
    }

    /// Load aboard: existing cargo plus manifested containers.
    pub fn current(&self) -> Load {
        Load {
            mass: self.existing_mass + self.manifested_mass,
            volume: self.existing_volume + self.manifested_volume,
            environment: Environment::Unpressurized,
        }
    }

    /// Fraction of mass capacity in use; 0 when the carrier has none.
    pub fn mass_utilization(&self) -> f64 {
        if self.max_cargo_mass > 0.0 {
            self.current().mass / self.max_cargo_mass
        } else {
            0.0
        }
    }

    pub fn volume_utilization(&self) -> f64 {
        if self.max_cargo_volume > 0.0 {
            self.current().volume / self.max_cargo_volume
        } else {
            0.0
        }
    }

    pub(crate) fn push(&mut self, id: ContainerId, load: Load) {
        self.containers.push(id);
        self.manifested_mass += load.mass;
        self.manifested_volume += load.volume;
    }
}

impl Carrier for CarrierManifest {
    fn max_cargo_mass(&self) -> f64 {
        self.max_cargo_mass
    }

    fn max_cargo_volume(&self) -> f64 {
        self.max_cargo_volume
    }

    fn cargo_environment(&self) -> Environment {
        self.cargo_environment
    }
}

/// Why demand could not be packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpackedReason {
    /// No container type serves the class and environment.
    NoContainerType,
    /// A single unit is larger than every suitable container.
    ExceedsContainer,
    /// Packaging overhead estimate, carried by the containers themselves.
    StowageOverhead,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnpackedDemand {
    pub demand: Demand,
    pub reason: UnpackedReason,
}

/// Demand that will not be delivered in time at one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub destination: Destination,
    pub node: LocationId,
    pub time: f64,
    /// Containers packed for this destination but on no carrier.
    pub containers: Vec<ContainerId>,
    /// Demand that never made it into a container.
    pub unpacked: Vec<UnpackedDemand>,
}

/// Loading of containers onto one carrier when its supply edge departs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestAction {
    /// Departure time of the supply edge.
    pub time: f64,
    /// Node the containers are loaded at.
    pub origin: LocationId,
    pub supply_edge: SupplyEdgeId,
    pub carrier: ElementId,
    pub containers: Vec<ContainerId>,
}

/// Result of one packing and manifesting pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub containers: Vec<PackedContainer>,
    /// Every (supply edge, carrier) pair, in edge then declaration order.
    pub carriers: Vec<CarrierManifest>,
    /// One loading action per carrier that received containers, in
    /// departure order.
    pub actions: Vec<ManifestAction>,
    /// Gaps in time order.
    pub gaps: Vec<Gap>,
}

impl Manifest {
    pub fn container(&self, id: ContainerId) -> Option<&PackedContainer> {
        self.containers.get(id.0)
    }

    pub fn carrier(&self, edge: SupplyEdgeId, carrier: ElementId) -> Option<&CarrierManifest> {
        self.carriers
            .iter()
            .find(|c| c.edge == edge && c.carrier == carrier)
    }

    /// Packed demand mass across all containers, excluding tare.
    pub fn packed_mass(&self) -> f64 {
        self.containers.iter().map(PackedContainer::packed_mass).sum()
    }

    /// Total container mass aboard carriers.
    pub fn manifested_mass(&self) -> f64 {
        self.carriers.iter().map(|c| c.manifested_mass).sum()
    }

    pub fn unmanifested(&self) -> impl Iterator<Item = &PackedContainer> {
        self.containers.iter().filter(|c| !c.is_manifested())
    }

    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::Resource;

    fn container(amount: f64) -> PackedContainer {
        let food = Arc::new(
            Resource::continuous(1, "Food", ClassOfSupply::COS2).with_packing_factor(0.5),
        );
        let mut contents = DemandSet::new();
        contents.add_amount(&food, amount);
        PackedContainer {
            id: ContainerId(0),
            tid: -10,
            name: "CTB 1".to_string(),
            destination: Destination::Point(SupplyPoint {
                node: LocationId(1),
                time: 0.0,
            }),
            node: LocationId(1),
            time: 0.0,
            cos: ClassOfSupply::COS2,
            environment: Environment::Unpressurized,
            mass: 0.83,
            volume: 0.053,
            max_cargo_mass: 26.8,
            max_cargo_volume: 0.049,
            contents,
            assignment: None,
        }
    }

    #[test]
    fn packed_mass_includes_packing_factor() {
        let c = container(10.0);
        assert_eq!(c.packed_mass(), 15.0);
        assert!((c.total_mass() - 15.83).abs() < 1e-9);
        assert_eq!(c.load().volume, 0.053);
    }

    #[test]
    fn carrier_utilization_counts_existing_cargo() {
        let snapshot = CarrierSnapshot {
            element: ElementId(4),
            name: "Lander".to_string(),
            max_cargo_mass: 100.0,
            max_cargo_volume: 0.0,
            cargo_environment: Environment::Pressurized,
            cargo_mass: 25.0,
            cargo_volume: 0.0,
        };
        let mut manifest = CarrierManifest::new(SupplyEdgeId(0), &snapshot);
        manifest.push(ContainerId(0), container(10.0).load());
        assert!((manifest.mass_utilization() - 0.4083).abs() < 1e-9);
        assert_eq!(manifest.volume_utilization(), 0.0);
    }
}

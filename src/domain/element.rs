//! Elements placed in the network and their capability traits.

use std::sync::Arc;

use serde::Serialize;

use super::cos::ClassOfSupply;
use super::network::{Network, Parent};
use super::resource::{DemandSet, Environment, Resource};
use crate::config::ScenarioConfig;
use crate::error::{LogisticsError, Result};
use crate::model::DemandModel;

/// Instance id of an element, unique within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational state category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    Active,
    Quiescent,
    Dormant,
    Decommissioned,
}

/// A named state with the demand models that apply while it is current.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementState {
    pub name: String,
    pub state_type: StateType,
    pub demand_models: Vec<DemandModel>,
}

impl ElementState {
    pub fn new(name: impl Into<String>, state_type: StateType) -> Self {
        Self {
            name: name.into(),
            state_type,
            demand_models: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: DemandModel) -> Self {
        self.demand_models.push(model);
        self
    }
}

/// A spare part installed in an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PartApplication {
    /// Catalog tid of the part item.
    pub part: i32,
    pub quantity: f64,
}

/// Cargo limits shared by carriers, vehicles and resource containers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarrierSpec {
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub cargo_environment: Environment,
    pub max_crew: u32,
}

impl CarrierSpec {
    pub fn new(max_cargo_mass: f64, max_cargo_volume: f64, cargo_environment: Environment) -> Self {
        Self {
            max_cargo_mass,
            max_cargo_volume,
            cargo_environment,
            max_crew: 0,
        }
    }

    pub fn with_crew(mut self, max_crew: u32) -> Self {
        self.max_crew = max_crew;
        self
    }

    fn validate(&self, name: &str) -> Result<()> {
        for (field, value) in [
            ("max_cargo_mass", self.max_cargo_mass),
            ("max_cargo_volume", self.max_cargo_volume),
        ] {
            if !(value > 0.0) {
                return Err(LogisticsError::InvalidCapacity {
                    name: name.to_string(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// A single-resource tank.
#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    pub resource: Arc<Resource>,
    pub amount: f64,
    pub max_amount: f64,
}

impl Tank {
    pub fn new(resource: Arc<Resource>, amount: f64, max_amount: f64) -> Self {
        Self {
            resource,
            amount,
            max_amount,
        }
    }

    pub fn mass(&self) -> f64 {
        self.amount * self.resource.unit_mass
    }
}

/// Mass, volume and required environment of a prospective load.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Load {
    pub mass: f64,
    pub volume: f64,
    pub environment: Environment,
}

/// Anything with bounded cargo capacity.
pub trait Carrier {
    fn max_cargo_mass(&self) -> f64;
    fn max_cargo_volume(&self) -> f64;
    fn cargo_environment(&self) -> Environment;

    fn max_crew(&self) -> u32 {
        0
    }

    /// Returns `true` if `load` fits on top of the `current` load.
    ///
    /// Volume is only checked when the scenario is volume constrained,
    /// environment only when it is environment constrained.
    fn can_add(&self, load: Load, current: Load, config: &ScenarioConfig) -> bool {
        let p = &config.precision;
        if p.mass_exceeds(current.mass + load.mass, self.max_cargo_mass()) {
            return false;
        }
        if config.constraints.volume_constrained
            && p.volume_exceeds(current.volume + load.volume, self.max_cargo_volume())
        {
            return false;
        }
        !config.constraints.environment_constrained
            || load.environment.fits_in(self.cargo_environment())
    }
}

impl Carrier for CarrierSpec {
    fn max_cargo_mass(&self) -> f64 {
        self.max_cargo_mass
    }

    fn max_cargo_volume(&self) -> f64 {
        self.max_cargo_volume
    }

    fn cargo_environment(&self) -> Environment {
        self.cargo_environment
    }

    fn max_crew(&self) -> u32 {
        self.max_crew
    }
}

/// Anything that can hold elements: locations and carrier elements.
pub trait Container {
    /// Key under which the network indexes this container's contents.
    fn as_parent(&self) -> Parent;

    fn contents<'n>(&self, network: &'n Network) -> &'n [ElementId] {
        network.contents_of(self.as_parent())
    }

    fn complete_contents(&self, network: &Network) -> Vec<ElementId> {
        network.complete_contents_of(self.as_parent())
    }

    /// Total mass of the elements held, including their own cargo.
    fn cargo_mass(&self, network: &Network) -> f64 {
        self.contents(network)
            .iter()
            .map(|&id| network.total_mass(id))
            .sum()
    }

    fn cargo_volume(&self, network: &Network) -> f64 {
        self.contents(network)
            .iter()
            .filter_map(|&id| network.element(id))
            .map(|e| e.volume)
            .sum()
    }

    fn crew_count(&self, network: &Network) -> usize {
        self.complete_contents(network)
            .into_iter()
            .filter_map(|id| network.element(id))
            .filter(|e| matches!(e.kind, ElementKind::CrewMember { .. }))
            .count()
    }
}

/// Capability variant of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Passive element (payload, hardware).
    Element,
    CrewMember {
        active_time_fraction: f64,
    },
    Carrier(CarrierSpec),
    PropulsiveVehicle {
        carrier: CarrierSpec,
        isp: f64,
        fuel: Tank,
    },
    /// Carrier that also holds packed resource stock.
    ResourceContainer {
        hold: CarrierSpec,
        contents: DemandSet,
    },
    ResourceTank(Tank),
}

/// A vehicle, crew member, container or other placeable object.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) uid: ElementId,
    pub tid: i32,
    pub name: String,
    pub cos: ClassOfSupply,
    pub environment: Environment,
    /// Dry mass (kg).
    pub mass: f64,
    /// Volume (m^3).
    pub volume: f64,
    pub accommodation_mass: f64,
    pub parts: Vec<PartApplication>,
    pub states: Vec<ElementState>,
    pub current_state: Option<usize>,
    pub kind: ElementKind,
    pub(crate) parent: Option<Parent>,
}

impl Element {
    pub fn new(tid: i32, name: impl Into<String>, cos: ClassOfSupply, mass: f64) -> Self {
        Self {
            uid: ElementId(0),
            tid,
            name: name.into(),
            cos,
            environment: Environment::Unpressurized,
            mass,
            volume: 0.0,
            accommodation_mass: 0.0,
            parts: Vec::new(),
            states: Vec::new(),
            current_state: None,
            kind: ElementKind::Element,
            parent: None,
        }
    }

    pub fn crew_member(tid: i32, name: impl Into<String>, mass: f64) -> Self {
        Self::new(tid, name, ClassOfSupply::COS0, mass)
            .with_kind(ElementKind::CrewMember {
                active_time_fraction: 0.667,
            })
            .with_environment(Environment::Pressurized)
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_part(mut self, part: i32, quantity: f64) -> Self {
        self.parts.push(PartApplication { part, quantity });
        self
    }

    /// Appends a state; the first state added becomes current.
    pub fn with_state(mut self, state: ElementState) -> Self {
        self.states.push(state);
        if self.current_state.is_none() {
            self.current_state = Some(0);
        }
        self
    }

    pub fn uid(&self) -> ElementId {
        self.uid
    }

    pub fn parent(&self) -> Option<Parent> {
        self.parent
    }

    pub fn state(&self) -> Option<&ElementState> {
        self.current_state.and_then(|i| self.states.get(i))
    }

    /// Demand models of the current state.
    pub fn demand_models(&self) -> &[DemandModel] {
        self.state().map_or(&[], |s| s.demand_models.as_slice())
    }

    pub fn is_decommissioned(&self) -> bool {
        self.state()
            .is_some_and(|s| s.state_type == StateType::Decommissioned)
    }

    /// Cargo limits if this element can carry others.
    pub fn carrier(&self) -> Option<&CarrierSpec> {
        match &self.kind {
            ElementKind::Carrier(spec)
            | ElementKind::PropulsiveVehicle { carrier: spec, .. }
            | ElementKind::ResourceContainer { hold: spec, .. } => Some(spec),
            _ => None,
        }
    }

    /// Mass of resources stowed in this element itself.
    pub fn resource_mass(&self) -> f64 {
        match &self.kind {
            ElementKind::ResourceContainer { contents, .. } => contents.total_mass(),
            ElementKind::ResourceTank(tank) | ElementKind::PropulsiveVehicle { fuel: tank, .. } => {
                tank.mass()
            }
            _ => 0.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.mass >= 0.0) {
            return Err(LogisticsError::InvalidCapacity {
                name: self.name.clone(),
                field: "mass",
                value: self.mass,
            });
        }
        if let Some(spec) = self.carrier() {
            spec.validate(&self.name)?;
        }
        if let ElementKind::ResourceTank(tank) | ElementKind::PropulsiveVehicle { fuel: tank, .. } =
            &self.kind
        {
            if !(tank.max_amount > 0.0) {
                return Err(LogisticsError::InvalidCapacity {
                    name: self.name.clone(),
                    field: "max_amount",
                    value: tank.max_amount,
                });
            }
        }
        if let Some(i) = self.current_state {
            if i >= self.states.len() {
                return Err(crate::config::ConfigError::new(
                    format!("elements.{}.current_state", self.name),
                    format!("index {i} out of {} states", self.states.len()),
                )
                .into());
            }
        }
        Ok(())
    }
}

impl Container for Element {
    fn as_parent(&self) -> Parent {
        Parent::Element(self.uid)
    }
}

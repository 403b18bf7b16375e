//! Container types available for packing and the class-to-container mapping.

use serde::Serialize;

use crate::config::ScenarioConfig;
use crate::domain::{Carrier, ClassOfSupply, Environment, Load, Resource};
use crate::error::{LogisticsError, Result};

/// A kind of resource container that packing may open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerType {
    /// Type id shared by every container of this kind.
    pub tid: i32,
    pub name: String,
    /// Classes of supply this container is used for.
    pub classes: Vec<ClassOfSupply>,
    /// Tare mass (kg).
    pub mass: f64,
    /// Outer volume (m^3).
    pub volume: f64,
    pub max_cargo_mass: f64,
    pub max_cargo_volume: f64,
    pub cargo_environment: Environment,
}

impl ContainerType {
    pub fn new(tid: i32, name: impl Into<String>, mass: f64, volume: f64) -> Self {
        Self {
            tid,
            name: name.into(),
            classes: Vec::new(),
            mass,
            volume,
            max_cargo_mass: 0.0,
            max_cargo_volume: 0.0,
            cargo_environment: Environment::Unpressurized,
        }
    }

    pub fn with_capacity(mut self, max_cargo_mass: f64, max_cargo_volume: f64) -> Self {
        self.max_cargo_mass = max_cargo_mass;
        self.max_cargo_volume = max_cargo_volume;
        self
    }

    pub fn with_cargo_environment(mut self, environment: Environment) -> Self {
        self.cargo_environment = environment;
        self
    }

    pub fn for_classes(mut self, classes: impl IntoIterator<Item = ClassOfSupply>) -> Self {
        self.classes.extend(classes);
        self
    }

    /// Returns `true` if this type serves `class` and its hold suits the
    /// environment of `resource`.
    pub fn accepts(&self, class: ClassOfSupply, resource: &Resource, config: &ScenarioConfig) -> bool {
        self.classes.contains(&class)
            && (!config.constraints.environment_constrained
                || resource.environment.fits_in(self.cargo_environment))
    }

    fn validate(&self) -> Result<()> {
        let invalid = |field, value| LogisticsError::InvalidCapacity {
            name: self.name.clone(),
            field,
            value,
        };
        if !(self.max_cargo_mass > 0.0) {
            return Err(invalid("max_cargo_mass", self.max_cargo_mass));
        }
        if !(self.max_cargo_volume > 0.0) {
            return Err(invalid("max_cargo_volume", self.max_cargo_volume));
        }
        if self.mass < 0.0 {
            return Err(invalid("mass", self.mass));
        }
        Ok(())
    }
}

impl Carrier for ContainerType {
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

/// How demand of a class of supply is stowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stowage {
    /// Packed into catalog container types.
    Container,
    /// Packed alone into a container sized to the demand.
    Bespoke,
    /// Not packed; reported as unpacked stowage overhead.
    Overhead,
}

/// Container types plus the rules for classes that use no catalog type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerCatalog {
    types: Vec<ContainerType>,
    bespoke: Vec<ClassOfSupply>,
    overhead: Vec<ClassOfSupply>,
    /// Bespoke container capacity relative to the packed demand.
    pub bespoke_margin: f64,
}

impl Default for ContainerCatalog {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            bespoke: Vec::new(),
            overhead: Vec::new(),
            bespoke_margin: 1.1,
        }
    }
}

pub const DCTB_TID: i32 = -22;
pub const CTB_TID: i32 = -10;
pub const HCTB_TID: i32 = -11;
pub const LT_TID: i32 = -13;
pub const LTD_TID: i32 = -14;
pub const SHOSS_TID: i32 = -15;
pub const PSHOSS_TID: i32 = -16;
pub const GT_TID: i32 = -17;
pub const GTD_TID: i32 = -18;
/// Type id of containers sized to their demand.
pub const BESPOKE_TID: i32 = 0;

impl ContainerCatalog {
    /// An empty catalog: nothing is packable until types are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard cargo bags, tanks and shelving.
    ///
    /// Bags carry crew provisions, crew operations and transportation
    /// items (COS 2, 3, 7). Liquid tanks carry propellants and water
    /// (COS 1, 201), gas tanks carry gases (COS 203), shelving carries
    /// spares split by environment (COS 4). Science and miscellaneous
    /// demand (COS 6, 10) get bespoke containers; stowage estimates
    /// (COS 5) are not packed.
    pub fn default_factory() -> Self {
        use ClassOfSupply as C;
        let bags = [C::COS2, C::COS3, C::COS7];
        let liquids = [C::COS1, C::COS201];
        Self::new()
            .with_type(
                ContainerType::new(HCTB_TID, "Half CTB", 0.5532, 0.0265)
                    .with_capacity(13.4, 0.0245)
                    .with_cargo_environment(Environment::Pressurized)
                    .for_classes(bags),
            )
            .with_type(
                ContainerType::new(CTB_TID, "CTB", 0.83, 0.053)
                    .with_capacity(26.8, 0.049)
                    .with_cargo_environment(Environment::Pressurized)
                    .for_classes(bags),
            )
            .with_type(
                ContainerType::new(DCTB_TID, "DCTB", 1.383, 0.106)
                    .with_capacity(53.6, 0.098)
                    .with_cargo_environment(Environment::Pressurized)
                    .for_classes(bags),
            )
            .with_type(
                ContainerType::new(LTD_TID, "Liquid Tank Derivative", 11.4567, 0.0249)
                    .with_capacity(24.9333, 0.0249)
                    .for_classes(liquids),
            )
            .with_type(
                ContainerType::new(LT_TID, "Liquid Tank", 34.37, 0.0748)
                    .with_capacity(74.8, 0.0748)
                    .for_classes(liquids),
            )
            .with_type(
                ContainerType::new(GTD_TID, "Gas Tank Derivative", 10.8, 0.275)
                    .with_capacity(10.0, 0.275)
                    .for_classes([C::COS203]),
            )
            .with_type(
                ContainerType::new(GT_TID, "Gas Tank", 108.0, 2.75)
                    .with_capacity(100.0, 2.75)
                    .for_classes([C::COS203]),
            )
            .with_type(
                ContainerType::new(SHOSS_TID, "SHOSS", 120.0, 0.4444)
                    .with_capacity(200.0, 0.4444)
                    .for_classes([C::COS4]),
            )
            .with_type(
                ContainerType::new(PSHOSS_TID, "Press. SHOSS", 0.0, 0.8)
                    .with_capacity(200.0, 0.8)
                    .with_cargo_environment(Environment::Pressurized)
                    .for_classes([C::COS4]),
            )
            .with_bespoke(C::COS6)
            .with_bespoke(C::COS10)
            .with_overhead(C::COS5)
    }

    pub fn with_type(mut self, container: ContainerType) -> Self {
        self.types.push(container);
        self
    }

    /// Packs `cos` into bespoke containers.
    pub fn with_bespoke(mut self, cos: ClassOfSupply) -> Self {
        self.bespoke.push(cos);
        self
    }

    /// Leaves `cos` unpacked as stowage overhead.
    pub fn with_overhead(mut self, cos: ClassOfSupply) -> Self {
        self.overhead.push(cos);
        self
    }

    pub fn types(&self) -> &[ContainerType] {
        &self.types
    }

    pub fn get(&self, tid: i32) -> Option<&ContainerType> {
        self.types.iter().find(|t| t.tid == tid)
    }

    /// Rejects types with non-positive capacity and a non-positive
    /// bespoke margin.
    pub fn validate(&self) -> Result<()> {
        for t in &self.types {
            t.validate()?;
        }
        if !(self.bespoke_margin > 0.0) {
            return Err(LogisticsError::InvalidCapacity {
                name: "bespoke containers".to_string(),
                field: "bespoke_margin",
                value: self.bespoke_margin,
            });
        }
        Ok(())
    }

    pub fn stowage(&self, cos: ClassOfSupply) -> Stowage {
        if self.overhead.iter().any(|&c| cos.is_instance_of(c)) {
            Stowage::Overhead
        } else if self.bespoke.iter().any(|&c| cos.is_instance_of(c)) {
            Stowage::Bespoke
        } else {
            Stowage::Container
        }
    }

    /// The most specific class served by some type that `cos` is an
    /// instance of. Gases (203) go to gas tanks even though they are also
    /// crew provisions (2).
    pub fn class_for(&self, cos: ClassOfSupply) -> Option<ClassOfSupply> {
        self.types
            .iter()
            .flat_map(|t| t.classes.iter().copied())
            .filter(|&c| cos.is_instance_of(c))
            .max_by_key(|c| c.id().to_string().len())
    }

    /// Types that accept `resource`, in declaration order.
    pub fn candidates(&self, resource: &Resource, config: &ScenarioConfig) -> Vec<&ContainerType> {
        let Some(class) = self.class_for(resource.cos) else {
            return Vec::new();
        };
        self.types
            .iter()
            .filter(|t| t.accepts(class, resource, config))
            .collect()
    }

    /// Picks the type to open for `load`: the smallest candidate that holds
    /// all of it, otherwise the largest candidate.
    ///
    /// Ties keep declaration order.
    pub fn select(
        &self,
        resource: &Resource,
        load: Load,
        config: &ScenarioConfig,
    ) -> Option<&ContainerType> {
        let by_capacity = |a: &&ContainerType, b: &&ContainerType| {
            a.max_cargo_mass.total_cmp(&b.max_cargo_mass)
        };
        let candidates = self.candidates(resource, config);
        candidates
            .iter()
            .copied()
            .filter(|t| t.can_add(load, Load::default(), config))
            .min_by(by_capacity)
            .or_else(|| {
                // max_by keeps the last of equal elements; reverse to keep the first
                candidates.iter().rev().copied().max_by(by_capacity)
            })
    }

    /// A container sized to hold `load` with the bespoke margin.
    pub fn bespoke(&self, resource: &Resource, load: Load, tare: f64) -> ContainerType {
        let name = if resource.cos.is_instance_of(ClassOfSupply::COS6) {
            "Science"
        } else {
            "Miscellaneous"
        };
        ContainerType::new(BESPOKE_TID, name, tare, load.volume * self.bespoke_margin)
            .with_capacity(
                load.mass * self.bespoke_margin,
                load.volume * self.bespoke_margin,
            )
            .with_cargo_environment(resource.environment)
            .for_classes([resource.cos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(mass: f64) -> Load {
        Load {
            mass,
            volume: 0.0,
            environment: Environment::Unpressurized,
        }
    }

    #[test]
    fn default_factory_is_valid() {
        let catalog = ContainerCatalog::default_factory();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.types().len(), 9);
        assert!(catalog.get(CTB_TID).is_some());
    }

    #[test]
    fn non_positive_capacity_rejected() {
        let catalog = ContainerCatalog::new()
            .with_type(ContainerType::new(-1, "Flat", 1.0, 1.0).with_capacity(0.0, 1.0));
        let err = catalog.validate();
        assert!(matches!(
            err,
            Err(LogisticsError::InvalidCapacity {
                field: "max_cargo_mass",
                ..
            })
        ));
    }

    #[test]
    fn selects_smallest_fitting_bag() {
        let catalog = ContainerCatalog::default_factory();
        let config = ScenarioConfig::baseline();
        let food = Resource::continuous(1, "Food", ClassOfSupply::COS2);

        let small = catalog.select(&food, load(10.0), &config).map(|t| t.tid);
        assert_eq!(small, Some(HCTB_TID));
        let medium = catalog.select(&food, load(20.0), &config).map(|t| t.tid);
        assert_eq!(medium, Some(CTB_TID));
        let huge = catalog.select(&food, load(500.0), &config).map(|t| t.tid);
        assert_eq!(huge, Some(DCTB_TID));
    }

    #[test]
    fn spares_shelving_follows_environment() {
        let catalog = ContainerCatalog::default_factory();
        let config = ScenarioConfig::baseline();
        let pump = Resource::item(2, "Pump", ClassOfSupply::COS4011, 5.0);
        let seal = pump.clone().with_environment(Environment::Pressurized);

        let open = catalog.select(&pump, load(5.0), &config).map(|t| t.tid);
        assert_eq!(open, Some(SHOSS_TID));
        let sealed = catalog
            .select(&seal, Load { environment: Environment::Pressurized, ..load(5.0) }, &config)
            .map(|t| t.tid);
        assert_eq!(sealed, Some(PSHOSS_TID));
    }

    #[test]
    fn stowage_rules() {
        let catalog = ContainerCatalog::default_factory();
        assert_eq!(catalog.stowage(ClassOfSupply::COS5), Stowage::Overhead);
        assert_eq!(catalog.stowage(ClassOfSupply::COS6), Stowage::Bespoke);
        assert_eq!(catalog.stowage(ClassOfSupply::COS10), Stowage::Bespoke);
        assert_eq!(catalog.stowage(ClassOfSupply::COS201), Stowage::Container);
    }

    #[test]
    fn water_goes_to_liquid_tanks() {
        let catalog = ContainerCatalog::default_factory();
        let config = ScenarioConfig::baseline();
        let water = Resource::continuous(1, "Water", ClassOfSupply::COS201);
        assert_eq!(catalog.class_for(water.cos), Some(ClassOfSupply::COS201));
        let tids: Vec<i32> = catalog
            .candidates(&water, &config)
            .iter()
            .map(|t| t.tid)
            .collect();
        assert_eq!(tids, vec![LTD_TID, LT_TID]);
    }

    #[test]
    fn selected_type_borrows_only_the_catalog() {
        let catalog = ContainerCatalog::default_factory();
        let chosen = {
            let config = ScenarioConfig::baseline();
            let water = Resource::continuous(1, "Water", ClassOfSupply::COS201);
            catalog.select(&water, load(20.0), &config)
        };
        assert_eq!(chosen.map(|t| t.tid), Some(LTD_TID));
    }

    #[test]
    fn unknown_class_has_no_candidates() {
        let catalog = ContainerCatalog::default_factory();
        let config = ScenarioConfig::baseline();
        let rover = Resource::item(3, "Rover", ClassOfSupply::COS9, 200.0);
        assert!(catalog.select(&rover, load(200.0), &config).is_none());
    }
}

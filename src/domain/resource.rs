//! Resources, demands and demand sets.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::cos::ClassOfSupply;
use crate::config::{PackingConfig, Precision};
use crate::error::{LogisticsError, Result};

/// Stowage environment of a resource, element or cargo hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Unpressurized,
    Pressurized,
}

impl Environment {
    /// Returns `true` when cargo requiring `self` may be stowed in a hold
    /// of environment `hold`.
    pub fn fits_in(self, hold: Environment) -> bool {
        self == Environment::Unpressurized || hold == Environment::Pressurized
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpressurized => write!(f, "unpressurized"),
            Self::Pressurized => write!(f, "pressurized"),
        }
    }
}

/// Resource variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Divisible quantity (kg of water, liters of fuel).
    Continuous,
    /// Discrete item counted in whole units.
    Item,
    /// Placeholder for "any resource of this class", 1 kg per unit.
    Generic,
}

/// A consumable, spare or other resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    /// Type id; negative for generic resources (`-cos`).
    pub tid: i32,
    pub name: String,
    pub cos: ClassOfSupply,
    pub kind: ResourceKind,
    pub environment: Environment,
    pub units: String,
    /// Mass of one unit (kg).
    pub unit_mass: f64,
    /// Volume of one unit (m^3).
    pub unit_volume: f64,
    /// Fractional stowage overhead per unit of mass and volume.
    pub packing_factor: f64,
}

impl Resource {
    /// Creates a continuous resource measured in kilograms.
    pub fn continuous(tid: i32, name: impl Into<String>, cos: ClassOfSupply) -> Self {
        Self {
            tid,
            name: name.into(),
            cos,
            kind: ResourceKind::Continuous,
            environment: Environment::Unpressurized,
            units: "kg".to_string(),
            unit_mass: 1.0,
            unit_volume: 0.0,
            packing_factor: 0.0,
        }
    }

    /// Creates a discrete item with the given unit mass.
    pub fn item(tid: i32, name: impl Into<String>, cos: ClassOfSupply, unit_mass: f64) -> Self {
        Self {
            kind: ResourceKind::Item,
            units: "item".to_string(),
            unit_mass,
            ..Self::continuous(tid, name, cos)
        }
    }

    /// Creates the generic resource standing for any resource of `cos`.
    ///
    /// Unit volume comes from a per-class table, the packing factor from the
    /// configured generic factors.
    pub fn generic(cos: ClassOfSupply, environment: Environment, packing: &PackingConfig) -> Self {
        let packing_factor = if cos == ClassOfSupply::COS203 {
            packing.gas
        } else if cos == ClassOfSupply::COS201 {
            packing.liquid
        } else if cos.is_instance_of(ClassOfSupply::COS6) {
            0.0
        } else if environment == Environment::Pressurized {
            packing.pressurized
        } else {
            packing.unpressurized
        };
        Self {
            tid: -i32::from(cos.id()),
            name: format!("Generic {}", cos.name()),
            cos,
            kind: ResourceKind::Generic,
            environment,
            units: "kg".to_string(),
            unit_mass: 1.0,
            unit_volume: generic_unit_volume(cos),
            packing_factor,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_unit_mass(mut self, unit_mass: f64) -> Self {
        self.unit_mass = unit_mass;
        self
    }

    pub fn with_unit_volume(mut self, unit_volume: f64) -> Self {
        self.unit_volume = unit_volume;
        self
    }

    pub fn with_packing_factor(mut self, packing_factor: f64) -> Self {
        self.packing_factor = packing_factor;
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            tid: self.tid,
            environment: self.environment,
        }
    }

    pub fn is_generic(&self) -> bool {
        self.kind == ResourceKind::Generic
    }

    pub fn is_item(&self) -> bool {
        self.kind == ResourceKind::Item
    }

    /// Returns `true` if stock of `self` can satisfy demand for `demanded`.
    ///
    /// Identical resources always match; a generic demand is met by any
    /// resource whose class is an instance of the generic class.
    pub fn substitutes_for(&self, demanded: &Resource) -> bool {
        self.key() == demanded.key() || (demanded.is_generic() && self.cos.is_instance_of(demanded.cos))
    }
}

fn generic_unit_volume(cos: ClassOfSupply) -> f64 {
    if cos == ClassOfSupply::COS201 {
        return 0.001;
    }
    match cos.base_class().id() {
        1 => 0.0019,
        2 | 5 | 10 => 0.007,
        3 | 6 | 7 => 0.005,
        4 => 0.003,
        8 | 9 => 0.0035,
        _ => 0.0,
    }
}

/// Identity of a resource within a demand set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceKey {
    pub tid: i32,
    pub environment: Environment,
}

/// Reference to a resource from a demand model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    /// A resource registered in the [`ResourceCatalog`].
    Catalog(i32),
    /// The generic resource of a class and environment.
    Generic(ClassOfSupply, Environment),
}

/// Registry of the resource types known to a scenario.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: BTreeMap<i32, Arc<Resource>>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource type.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the tid is already registered or is
    /// negative (reserved for generic resources), or if the unit mass is not
    /// positive.
    pub fn add(&mut self, resource: Resource) -> Result<Arc<Resource>> {
        if resource.tid < 0 || self.resources.contains_key(&resource.tid) {
            return Err(crate::config::ConfigError::new(
                "resources",
                format!("tid {} for \"{}\" is reserved or already used", resource.tid, resource.name),
            )
            .into());
        }
        if !(resource.unit_mass > 0.0) {
            return Err(LogisticsError::InvalidCapacity {
                name: resource.name.clone(),
                field: "unit_mass",
                value: resource.unit_mass,
            });
        }
        let resource = Arc::new(resource);
        self.resources.insert(resource.tid, Arc::clone(&resource));
        Ok(resource)
    }

    pub fn get(&self, tid: i32) -> Option<&Arc<Resource>> {
        self.resources.get(&tid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    /// Resolves a model's resource reference.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::UnknownResource`] naming `context` when a
    /// catalog tid is not registered.
    pub fn resolve(
        &self,
        reference: ResourceRef,
        packing: &PackingConfig,
        context: impl FnOnce() -> String,
    ) -> Result<Arc<Resource>> {
        match reference {
            ResourceRef::Catalog(tid) => {
                self.get(tid)
                    .cloned()
                    .ok_or_else(|| LogisticsError::UnknownResource {
                        tid,
                        context: context(),
                    })
            }
            ResourceRef::Generic(cos, env) => Ok(Arc::new(Resource::generic(cos, env, packing))),
        }
    }
}

/// A signed quantity of one resource. Positive amounts are consumption,
/// negative amounts production.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Demand {
    pub resource: Arc<Resource>,
    pub amount: f64,
}

impl Demand {
    pub fn new(resource: Arc<Resource>, amount: f64) -> Self {
        Self { resource, amount }
    }

    pub fn mass(&self) -> f64 {
        self.amount * self.resource.unit_mass
    }

    pub fn volume(&self) -> f64 {
        self.amount * self.resource.unit_volume
    }

    /// Mass including stowage overhead.
    pub fn packed_mass(&self) -> f64 {
        self.mass() * (1.0 + self.resource.packing_factor)
    }

    /// Volume including stowage overhead.
    pub fn packed_volume(&self) -> f64 {
        self.volume() * (1.0 + self.resource.packing_factor)
    }
}

/// Demands keyed by resource, iterated in resource-key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandSet {
    demands: BTreeMap<ResourceKey, Demand>,
}

impl DemandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a demand, merging with any existing demand for the same resource.
    pub fn add(&mut self, demand: Demand) {
        self.demands
            .entry(demand.resource.key())
            .and_modify(|d| d.amount += demand.amount)
            .or_insert(demand);
    }

    pub fn add_amount(&mut self, resource: &Arc<Resource>, amount: f64) {
        self.add(Demand::new(Arc::clone(resource), amount));
    }

    /// Merges every demand of `other` into `self`.
    pub fn merge(&mut self, other: &DemandSet) {
        for d in other.iter() {
            self.add(d.clone());
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Demand> {
        self.demands.get(key)
    }

    pub fn get_mut(&mut self, key: &ResourceKey) -> Option<&mut Demand> {
        self.demands.get_mut(key)
    }

    pub fn remove(&mut self, key: &ResourceKey) -> Option<Demand> {
        self.demands.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Demand> {
        self.demands.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Demand> {
        self.demands.values_mut()
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Rounds every amount to the demand precision and drops zero entries.
    pub fn clean(&mut self, precision: &Precision) {
        for d in self.demands.values_mut() {
            d.amount = precision.round_demand(d.amount);
        }
        self.demands.retain(|_, d| d.amount != 0.0);
    }

    pub fn total_mass(&self) -> f64 {
        self.demands.values().map(Demand::mass).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.demands.values().map(Demand::volume).sum()
    }

    /// Positive (consumed) entries.
    pub fn consumption(&self) -> DemandSet {
        self.filtered(|d| d.amount > 0.0)
    }

    /// Negative (produced) entries, kept negative.
    pub fn production(&self) -> DemandSet {
        self.filtered(|d| d.amount < 0.0)
    }

    fn filtered(&self, keep: impl Fn(&Demand) -> bool) -> DemandSet {
        DemandSet {
            demands: self
                .demands
                .iter()
                .filter(|(_, d)| keep(d))
                .map(|(k, d)| (*k, d.clone()))
                .collect(),
        }
    }

    /// Returns a copy with every amount multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> DemandSet {
        let mut out = self.clone();
        for d in out.demands.values_mut() {
            d.amount *= factor;
        }
        out
    }

    /// Stowage estimate: generic class-5 demand equal to the sum of each
    /// consumed mass times its packing factor. Class-5 demand adds none.
    pub fn packing_demand(&self, packing: &PackingConfig) -> Option<Demand> {
        let amount: f64 = self
            .demands
            .values()
            .filter(|d| d.amount > 0.0)
            .filter(|d| !d.resource.cos.is_instance_of(ClassOfSupply::COS5))
            .map(|d| d.mass() * d.resource.packing_factor)
            .sum();
        (amount > 0.0).then(|| {
            let stowage = Resource::generic(ClassOfSupply::COS5, Environment::Unpressurized, packing);
            Demand::new(Arc::new(stowage), amount)
        })
    }
}

impl FromIterator<Demand> for DemandSet {
    fn from_iter<I: IntoIterator<Item = Demand>>(iter: I) -> Self {
        let mut set = DemandSet::new();
        for d in iter {
            set.add(d);
        }
        set
    }
}

impl Serialize for DemandSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.demands.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Arc<Resource> {
        Arc::new(
            Resource::continuous(1, "Water", ClassOfSupply::COS201)
                .with_unit_volume(0.001)
                .with_packing_factor(0.5),
        )
    }

    fn filter() -> Arc<Resource> {
        Arc::new(
            Resource::item(2, "Air Filter", ClassOfSupply::COS4011, 3.5)
                .with_environment(Environment::Pressurized)
                .with_unit_volume(0.01),
        )
    }

    #[test]
    fn add_merges_same_resource() {
        let mut set = DemandSet::new();
        set.add_amount(&water(), 2.0);
        set.add_amount(&water(), 3.0);
        set.add_amount(&filter(), 1.0);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&water().key()).map(|d| d.amount), Some(5.0));
    }

    #[test]
    fn totals_equal_sum_of_demands() {
        let set: DemandSet = [
            Demand::new(water(), 4.0),
            Demand::new(filter(), 2.0),
            Demand::new(water(), -1.0),
        ]
        .into_iter()
        .collect();
        let mass: f64 = set.iter().map(Demand::mass).sum();
        let volume: f64 = set.iter().map(Demand::volume).sum();
        assert!((set.total_mass() - mass).abs() < 1e-9);
        assert!((set.total_mass() - 10.0).abs() < 1e-9);
        assert!((set.total_volume() - volume).abs() < 1e-9);
    }

    #[test]
    fn clean_removes_rounded_zeros() {
        let mut set = DemandSet::new();
        set.add_amount(&water(), 0.004);
        set.add_amount(&filter(), 1.006);
        set.clean(&Precision::default());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&filter().key()).map(|d| d.amount), Some(1.01));
    }

    #[test]
    fn consumption_and_production_split() {
        let mut set = DemandSet::new();
        set.add_amount(&water(), -3.0);
        set.add_amount(&filter(), 1.0);
        assert_eq!(set.consumption().len(), 1);
        assert_eq!(set.production().iter().map(|d| d.amount).sum::<f64>(), -3.0);
    }

    #[test]
    fn generic_resource_uses_class_tables() {
        let packing = PackingConfig::default();
        let gas = Resource::generic(ClassOfSupply::COS203, Environment::Pressurized, &packing);
        assert_eq!(gas.tid, -203);
        assert_eq!(gas.packing_factor, 1.0);
        assert_eq!(gas.unit_volume, 0.007);
        let spares = Resource::generic(ClassOfSupply::COS4, Environment::Unpressurized, &packing);
        assert_eq!(spares.packing_factor, 0.6);
        assert_eq!(spares.unit_volume, 0.003);
    }

    #[test]
    fn generic_demand_accepts_subclass_stock() {
        let packing = PackingConfig::default();
        let generic = Resource::generic(ClassOfSupply::COS4, Environment::Pressurized, &packing);
        assert!(filter().substitutes_for(&generic));
        assert!(!water().substitutes_for(&generic));
        assert!(!filter().substitutes_for(&water()));
    }

    #[test]
    fn packing_demand_sums_overhead() {
        let mut set = DemandSet::new();
        set.add_amount(&water(), 10.0);
        set.add_amount(&filter(), 2.0);
        let stowage = set.packing_demand(&PackingConfig::default());
        assert_eq!(stowage.as_ref().map(|d| d.amount), Some(5.0));
        assert_eq!(stowage.map(|d| d.resource.cos), Some(ClassOfSupply::COS5));
    }

    #[test]
    fn packing_demand_counts_item_mass() {
        let mut set = DemandSet::new();
        set.add_amount(&Arc::new(filter().as_ref().clone().with_packing_factor(0.5)), 2.0);
        let stowage = set.packing_demand(&PackingConfig::default());
        assert_eq!(stowage.map(|d| d.amount), Some(3.5));

        let mut overhead = DemandSet::new();
        let packing = PackingConfig::default();
        let generic = Resource::generic(ClassOfSupply::COS5, Environment::Unpressurized, &packing);
        overhead.add_amount(&Arc::new(generic), 4.0);
        assert!(overhead.packing_demand(&packing).is_none());
    }

    #[test]
    fn catalog_rejects_duplicates_and_unknowns() {
        let mut catalog = ResourceCatalog::new();
        assert!(catalog.add(Resource::continuous(1, "Water", ClassOfSupply::COS201)).is_ok());
        assert!(catalog.add(Resource::continuous(1, "Oxygen", ClassOfSupply::COS203)).is_err());
        let packing = PackingConfig::default();
        let err = catalog.resolve(ResourceRef::Catalog(9), &packing, || "element 4".to_string());
        assert!(matches!(err, Err(LogisticsError::UnknownResource { tid: 9, .. })));
    }

    #[test]
    fn environment_fit() {
        assert!(Environment::Unpressurized.fits_in(Environment::Pressurized));
        assert!(!Environment::Pressurized.fits_in(Environment::Unpressurized));
    }
}

//! Demand models attached to element states.

use std::sync::Arc;

use crate::config::ScenarioConfig;
use crate::domain::{
    ClassOfSupply, Container, DemandSet, Element, Environment, Network, ResourceCatalog,
    ResourceRef,
};
use crate::error::Result;

/// Standard gravity (m/s^2) used by the rocket equation.
pub const G0: f64 = 9.806_65;

/// Window and placement a demand model is evaluated for.
///
/// Demand is generated for the half-open interval `[start, end)`; a
/// zero-length window covers exactly the instant `start`.
pub struct DemandContext<'a> {
    pub network: &'a Network,
    pub element: &'a Element,
    pub start: f64,
    pub end: f64,
}

impl DemandContext<'_> {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns `true` if the instant `t` falls in this window.
    pub fn covers(&self, t: f64) -> bool {
        if self.start == self.end {
            t == self.start
        } else {
            self.start <= t && t < self.end
        }
    }
}

/// A policy producing signed resource demand for an element.
///
/// Models are pure: the same element, placement and window always yield
/// the same demand set.
#[derive(Debug, Clone, PartialEq)]
pub enum DemandModel {
    /// Constant rates (units per day).
    Rated { rates: Vec<(ResourceRef, f64)> },
    /// Constant rates (units per crew member per day), scaled by the crew
    /// aboard the element.
    CrewRated { rates: Vec<(ResourceRef, f64)> },
    /// Spares proportional to element mass; rates are fractions of element
    /// mass per year.
    SparingByMass {
        unpressurized_rate: f64,
        pressurized_rate: f64,
        parts_list: bool,
    },
    /// Propellant for a single burn, sized by the rocket equation on the
    /// mass of the stack the element belongs to.
    TimedImpulse {
        burn_time: f64,
        /// Velocity change (m/s).
        delta_v: f64,
        /// Specific impulse (s).
        isp: f64,
        propellant: ResourceRef,
    },
    /// Fixed amounts demanded once at `time`.
    Fixed {
        time: f64,
        amounts: Vec<(ResourceRef, f64)>,
    },
}

impl DemandModel {
    /// Resources this model can demand directly.
    pub fn references(&self) -> Vec<ResourceRef> {
        match self {
            Self::Rated { rates } | Self::CrewRated { rates } => {
                rates.iter().map(|&(r, _)| r).collect()
            }
            Self::Fixed { amounts, .. } => amounts.iter().map(|&(r, _)| r).collect(),
            Self::TimedImpulse { propellant, .. } => vec![*propellant],
            Self::SparingByMass { .. } => Vec::new(),
        }
    }

    /// The instant a one-shot model fires at, if it is one.
    pub fn instant(&self) -> Option<f64> {
        match self {
            Self::TimedImpulse { burn_time, .. } => Some(*burn_time),
            Self::Fixed { time, .. } => Some(*time),
            _ => None,
        }
    }

    /// Generates the demand for `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LogisticsError::UnknownResource`] if a
    /// referenced resource or part is not in `catalog`.
    pub fn generate(
        &self,
        ctx: &DemandContext<'_>,
        catalog: &ResourceCatalog,
        config: &ScenarioConfig,
    ) -> Result<DemandSet> {
        let mut demands = DemandSet::new();
        let resolve = |r: ResourceRef| {
            catalog.resolve(r, &config.packing, || {
                format!("element {} ({})", ctx.element.uid(), ctx.element.name)
            })
        };

        match self {
            Self::Rated { rates } => {
                for &(r, rate) in rates {
                    demands.add_amount(&resolve(r)?, rate * ctx.duration());
                }
            }
            Self::CrewRated { rates } => {
                let crew = ctx.element.crew_count(ctx.network) as f64;
                for &(r, rate) in rates {
                    demands.add_amount(&resolve(r)?, rate * crew * ctx.duration());
                }
            }
            Self::SparingByMass {
                unpressurized_rate,
                pressurized_rate,
                parts_list,
            } => {
                sparing_by_mass(
                    ctx,
                    *unpressurized_rate,
                    *pressurized_rate,
                    *parts_list,
                    &resolve,
                    config,
                    &mut demands,
                )?;
            }
            Self::TimedImpulse {
                burn_time,
                delta_v,
                isp,
                propellant,
            } => {
                if ctx.covers(*burn_time) && *isp > 0.0 {
                    let resource = resolve(*propellant)?;
                    let root = ctx.network.stack_root(ctx.element.uid());
                    let stack_mass = ctx.network.total_mass(root);
                    let fuel_mass = stack_mass * (1.0 - (-delta_v / (isp * G0)).exp());
                    demands.add_amount(&resource, fuel_mass / resource.unit_mass);
                }
            }
            Self::Fixed { time, amounts } => {
                if ctx.covers(*time) {
                    for &(r, amount) in amounts {
                        demands.add_amount(&resolve(r)?, amount);
                    }
                }
            }
        }

        demands.clean(&config.precision);
        Ok(demands)
    }
}

fn sparing_by_mass(
    ctx: &DemandContext<'_>,
    unpressurized_rate: f64,
    pressurized_rate: f64,
    parts_list: bool,
    resolve: &dyn Fn(ResourceRef) -> Result<Arc<crate::domain::Resource>>,
    config: &ScenarioConfig,
    demands: &mut DemandSet,
) -> Result<()> {
    let element = ctx.element;
    let years = ctx.duration() / 365.0;

    let mut parts = Vec::new();
    let mut press_mass = 0.0;
    let mut unpress_mass = 0.0;
    if parts_list {
        for p in element.parts.iter().filter(|p| p.quantity > 0.0) {
            let part = resolve(ResourceRef::Catalog(p.part))?;
            match part.environment {
                Environment::Pressurized => press_mass += p.quantity * part.unit_mass,
                Environment::Unpressurized => unpress_mass += p.quantity * part.unit_mass,
            }
            parts.push((part, p.quantity));
        }
    }
    let generic_mass = if parts_list {
        (element.mass - press_mass - unpress_mass).max(0.0)
    } else {
        element.mass
    };

    let share = |rate: f64, numerator: f64, env_mass: f64| {
        let denominator = generic_mass + env_mass;
        if denominator > 0.0 {
            years * rate * element.mass * numerator / denominator
        } else {
            0.0
        }
    };

    for (part, quantity) in parts {
        let amount = match part.environment {
            Environment::Pressurized => share(pressurized_rate, quantity, press_mass),
            Environment::Unpressurized => share(unpressurized_rate, quantity, unpress_mass),
        };
        demands.add_amount(&part, amount);
    }

    for (env, rate, env_mass) in [
        (Environment::Unpressurized, unpressurized_rate, unpress_mass),
        (Environment::Pressurized, pressurized_rate, press_mass),
    ] {
        let generic = Arc::new(crate::domain::Resource::generic(
            ClassOfSupply::COS4,
            env,
            &config.packing,
        ));
        demands.add_amount(&generic, share(rate, generic_mass, env_mass));
    }
    Ok(())
}

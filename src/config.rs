//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default. The value is
/// passed explicitly to the demand simulator and the manifest engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Rounding precision for time, demand, mass and volume.
    #[serde(default)]
    pub precision: Precision,
    /// Capacity constraint toggles.
    #[serde(default)]
    pub constraints: ConstraintConfig,
    /// Item discretization policy.
    #[serde(default)]
    pub items: ItemConfig,
    /// Generic packing factors per environment class.
    #[serde(default)]
    pub packing: PackingConfig,
    /// Demand simulation parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Rounding precision applied before every numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Precision {
    /// Time precision (days, must be > 0).
    pub time: f64,
    /// Demand amount precision (units, must be > 0).
    pub demand: f64,
    /// Mass precision (kg, must be > 0).
    pub mass: f64,
    /// Volume precision (m^3, must be > 0).
    pub volume: f64,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            time: 0.05,
            demand: 0.01,
            mass: 0.01,
            volume: 1e-6,
        }
    }
}

impl Precision {
    /// Rounds a time to the configured precision, then to milliday
    /// resolution to remove representation noise.
    ///
    /// # Examples
    ///
    /// ```
    /// use space_logistics_sim::config::Precision;
    ///
    /// let p = Precision::default();
    /// assert_eq!(p.round_time(1.26), 1.25);
    /// assert_eq!(p.round_time(3.0), 3.0);
    /// ```
    pub fn round_time(&self, t: f64) -> f64 {
        ((t / self.time).round() * self.time * 1000.0).round() / 1000.0
    }

    /// Rounds a demand amount to the configured precision.
    pub fn round_demand(&self, amount: f64) -> f64 {
        round_to(amount, self.demand)
    }

    /// Rounds a mass to the configured precision.
    pub fn round_mass(&self, mass: f64) -> f64 {
        round_to(mass, self.mass)
    }

    /// Rounds a volume to the configured precision.
    pub fn round_volume(&self, volume: f64) -> f64 {
        round_to(volume, self.volume)
    }

    /// Returns `true` when `value` exceeds `limit` by more than half the
    /// mass precision.
    pub fn mass_exceeds(&self, value: f64, limit: f64) -> bool {
        value - limit > self.mass / 2.0
    }

    /// Returns `true` when `value` exceeds `limit` by more than half the
    /// volume precision.
    pub fn volume_exceeds(&self, value: f64, limit: f64) -> bool {
        value - limit > self.volume / 2.0
    }

    /// Returns `true` when `a` is not later than `b` after rounding.
    pub fn time_not_after(&self, a: f64, b: f64) -> bool {
        self.round_time(a) <= self.round_time(b)
    }
}

fn round_to(value: f64, precision: f64) -> f64 {
    let rounded = (value / precision).round() * precision;
    // collapse -0.0 so aggregation keys and exports stay stable
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Capacity constraint toggles.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstraintConfig {
    /// Enforce volume limits on containers and carriers.
    pub volume_constrained: bool,
    /// Require pressurized stowage for pressurized resources.
    pub environment_constrained: bool,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            volume_constrained: false,
            environment_constrained: true,
        }
    }
}

/// Scope over which fractional item demand accumulates before whole
/// units are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemDiscretization {
    /// Items are demanded in fractional amounts.
    #[default]
    None,
    /// One accumulator per element.
    ByElement,
    /// One accumulator per location.
    ByLocation,
    /// One accumulator for the whole scenario.
    ByScenario,
}

/// Item discretization policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ItemConfig {
    /// Accumulator scope.
    pub discretization: ItemDiscretization,
    /// Fraction of a unit (0.0-1.0) at which an accumulated item is
    /// demanded as a whole unit. 0 emits on any positive remainder.
    pub aggregation: f64,
}

/// Generic packing factors per environment class.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackingConfig {
    /// Gases (class 203).
    pub gas: f64,
    /// Liquids (class 201).
    pub liquid: f64,
    /// Other pressurized resources.
    pub pressurized: f64,
    /// Other unpressurized resources.
    pub unpressurized: f64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            gas: 1.0,
            liquid: 0.5,
            pressurized: 1.2,
            unpressurized: 0.6,
        }
    }
}

/// Demand simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Longest span (days) a single demand evaluation covers (must be > 0).
    pub max_demand_interval: f64,
    /// Allow parts of decommissioned elements to satisfy demand.
    pub scavenge_spares: bool,
    /// Add COS5 packaging overhead for each demand record.
    pub packing_demands: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_demand_interval: 1.0,
            scavenge_spares: false,
            packing_demands: false,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"precision.mass"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self {
            precision: Precision::default(),
            constraints: ConstraintConfig::default(),
            items: ItemConfig::default(),
            packing: PackingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }

    /// Returns the volume-constrained preset: volume limits enforced and
    /// items demanded in whole units per element.
    pub fn volume_constrained() -> Self {
        Self {
            constraints: ConstraintConfig {
                volume_constrained: true,
                ..ConstraintConfig::default()
            },
            items: ItemConfig {
                discretization: ItemDiscretization::ByElement,
                aggregation: 0.5,
            },
            ..Self::baseline()
        }
    }

    /// Returns the coarse preset: weekly demand evaluation, tenth-of-a-day
    /// time resolution and scavenging enabled.
    pub fn coarse() -> Self {
        Self {
            precision: Precision {
                time: 0.1,
                ..Precision::default()
            },
            simulation: SimulationConfig {
                max_demand_interval: 7.0,
                scavenge_spares: true,
                ..SimulationConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "volume_constrained", "coarse"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "volume_constrained" => Ok(Self::volume_constrained()),
            "coarse" => Ok(Self::coarse()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let p = &self.precision;
        for (field, value) in [
            ("precision.time", p.time),
            ("precision.demand", p.demand),
            ("precision.mass", p.mass),
            ("precision.volume", p.volume),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                errors.push(ConfigError::new(field, format!("must be > 0, got {value}")));
            }
        }

        if !(0.0..=1.0).contains(&self.items.aggregation) {
            errors.push(ConfigError::new("items.aggregation", "must be in [0.0, 1.0]"));
        }

        let pk = &self.packing;
        for (field, value) in [
            ("packing.gas", pk.gas),
            ("packing.liquid", pk.liquid),
            ("packing.pressurized", pk.pressurized),
            ("packing.unpressurized", pk.unpressurized),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                errors.push(ConfigError::new(field, format!("must be >= 0, got {value}")));
            }
        }

        let s = &self.simulation;
        if !(s.max_demand_interval > 0.0 && s.max_demand_interval.is_finite()) {
            errors.push(ConfigError::new(
                "simulation.max_demand_interval",
                format!("must be > 0, got {}", s.max_demand_interval),
            ));
        }

        errors
    }
}

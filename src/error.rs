//! Error types for scenario validation, simulation and packing.

use crate::config::ConfigError;

/// Hard failures that stop a simulation or packing run.
///
/// Shortfalls (unsatisfied demand, gaps) are not errors; they are part of
/// the returned results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogisticsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("edge {edge} references missing node {missing}")]
    MalformedNetwork { edge: String, missing: u64 },

    #[error("unknown location {0}")]
    UnknownLocation(u64),

    #[error("unknown element {0}")]
    UnknownElement(u64),

    #[error("unknown resource {tid} referenced by {context}")]
    UnknownResource { tid: i32, context: String },

    #[error("{name}: {field} must be > 0, got {value}")]
    InvalidCapacity {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("timeline segment {segment}: {reason}")]
    InvalidTimeline { segment: usize, reason: String },

    #[error("run cancelled")]
    Cancelled,
}

impl LogisticsError {
    /// Builds an error from the first configuration validation failure.
    pub fn from_validation(mut errors: Vec<ConfigError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self::Config(errors.swap_remove(0)))
        }
    }
}

pub type Result<T> = std::result::Result<T, LogisticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_transparent() {
        let err: LogisticsError = ConfigError::new("precision.mass", "must be > 0").into();
        assert_eq!(err.to_string(), "config error: precision.mass: must be > 0");
    }

    #[test]
    fn unknown_resource_names_context() {
        let err = LogisticsError::UnknownResource {
            tid: 7,
            context: "element 3 (Habitat)".to_string(),
        };
        assert!(err.to_string().contains("element 3 (Habitat)"));
    }

    #[test]
    fn empty_validation_is_ok() {
        assert!(LogisticsError::from_validation(Vec::new()).is_none());
    }
}

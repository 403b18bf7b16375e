//! Space-logistics demand simulation and manifest packing.
//!
//! A [`sim::DemandSimulator`] replays a mission timeline over a
//! [`domain::Network`] and reports where and when resources are needed; a
//! [`manifest::ManifestEngine`] packs that demand into containers, puts the
//! containers on carriers and reports the gaps.

pub mod config;
pub mod domain;
pub mod error;
/// Query results and CSV export.
pub mod io;
/// Container packing and carrier manifesting.
pub mod manifest;
pub mod model;
/// Demand simulator, timeline and post-hoc summary.
pub mod sim;

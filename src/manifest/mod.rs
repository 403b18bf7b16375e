/// Container types and the default container factory.
pub mod catalog;
pub mod engine;
mod manifesting;
mod packing;
/// Packed containers, carrier manifests and gaps.
pub mod types;

pub use catalog::{ContainerCatalog, ContainerType, Stowage};
pub use engine::ManifestEngine;
pub use types::{
    Assignment, CarrierManifest, ContainerId, Destination, Gap, Manifest, ManifestAction,
    PackedContainer, UnpackedDemand, UnpackedReason,
};

//! Domain model: class-of-supply taxonomy, resources, network and elements.

pub mod cos;
pub mod element;
pub mod network;
pub mod resource;

pub use cos::ClassOfSupply;
pub use element::{
    Carrier, CarrierSpec, Container, Element, ElementId, ElementKind, ElementState, Load,
    PartApplication, StateType, Tank,
};
pub use network::{Body, Edge, EdgeKind, Location, LocationId, Network, Node, NodeKind, Parent};
pub use resource::{
    Demand, DemandSet, Environment, Resource, ResourceCatalog, ResourceKey, ResourceKind,
    ResourceRef,
};

/// Cooperative cancellation token.
pub mod cancel;
/// Demand-evaluation interval clock.
pub mod clock;
mod discretize;
pub mod engine;
/// Post-hoc logistics summary.
pub mod kpi;
mod stock;
pub mod timeline;
pub mod types;

pub use cancel::CancelToken;
pub use engine::DemandSimulator;
pub use kpi::LogisticsSummary;
pub use timeline::{MissionDemand, Segment, SegmentKind, StateChange, Timeline};
pub use types::{
    CarrierSnapshot, DemandReport, Scavenge, SimDemand, SupplyEdge, SupplyEdgeId, SupplyPoint,
    UnaggregatedDemand, UnaggregatedReason,
};

/// Serializable query results.
pub mod analysis;
/// CSV (and optional JSON) export.
pub mod export;

pub use analysis::{
    ActionLine, EdgeDemand, ManifestAnalysis, NodeDemand, RawDemand, ResourceLine, edge_demands,
    manifest_analysis, node_demands, raw_demands,
};

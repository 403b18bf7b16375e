//! Post-hoc summary of a simulation and manifest.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::domain::ClassOfSupply;
use crate::manifest::Manifest;

use super::types::DemandReport;

/// Aggregate logistics indicators derived from a complete run.
///
/// Computed post-hoc from the report and manifest so the figures always
/// agree with the detailed records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticsSummary {
    /// Number of raw demand records.
    pub demand_records: usize,
    /// Total unsatisfied demand mass (kg, production nets against it).
    pub unsatisfied_mass: f64,
    /// Unsatisfied mass per base class of supply (kg).
    pub unsatisfied_by_class: BTreeMap<ClassOfSupply, f64>,
    /// Unsatisfied records with no supply point or supply edge.
    pub unaggregated_count: usize,
    /// Parts taken from decommissioned elements (units).
    pub scavenged_units: f64,
    pub container_count: usize,
    pub unmanifested_count: usize,
    /// Packed demand mass including stowage overhead (kg).
    pub packed_mass: f64,
    /// Container mass aboard carriers, tare included (kg).
    pub manifested_mass: f64,
    pub gap_count: usize,
    /// Highest mass utilization of any carrier on any supply edge.
    pub peak_carrier_utilization: f64,
}

impl LogisticsSummary {
    /// Computes the summary.
    ///
    /// # Arguments
    ///
    /// * `report` - Demand simulation output
    /// * `manifest` - Packing and manifesting output for the same report
    pub fn from_reports(report: &DemandReport, manifest: &Manifest) -> Self {
        let mut unsatisfied_by_class = BTreeMap::new();
        for demand in report.unsatisfied.iter().flat_map(|d| d.demands.iter()) {
            *unsatisfied_by_class
                .entry(demand.resource.cos.base_class())
                .or_insert(0.0) += demand.mass();
        }

        let peak_carrier_utilization = manifest
            .carriers
            .iter()
            .map(|c| c.mass_utilization())
            .fold(0.0_f64, f64::max);

        Self {
            demand_records: report.raw.len(),
            unsatisfied_mass: report.unsatisfied_mass(),
            unsatisfied_by_class,
            unaggregated_count: report.unaggregated.len(),
            scavenged_units: report.scavenged.iter().map(|s| s.amount).sum(),
            container_count: manifest.containers.len(),
            unmanifested_count: manifest.unmanifested().count(),
            packed_mass: manifest.packed_mass(),
            manifested_mass: manifest.manifested_mass(),
            gap_count: manifest.gaps.len(),
            peak_carrier_utilization,
        }
    }
}

impl fmt::Display for LogisticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Logistics Summary ---")?;
        writeln!(f, "Demand records:        {}", self.demand_records)?;
        writeln!(f, "Unsatisfied demand:    {:.2} kg", self.unsatisfied_mass)?;
        for (class, mass) in &self.unsatisfied_by_class {
            writeln!(f, "  {class}: {mass:.2} kg")?;
        }
        writeln!(f, "Unaggregated records:  {}", self.unaggregated_count)?;
        writeln!(f, "Scavenged parts:       {:.2}", self.scavenged_units)?;
        writeln!(
            f,
            "Containers:            {} ({} unmanifested)",
            self.container_count, self.unmanifested_count
        )?;
        writeln!(f, "Packed mass:           {:.2} kg", self.packed_mass)?;
        writeln!(f, "Manifested mass:       {:.2} kg", self.manifested_mass)?;
        writeln!(
            f,
            "Peak carrier load:     {:.1}%",
            100.0 * self.peak_carrier_utilization
        )?;
        write!(f, "Gaps:                  {}", self.gap_count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{DemandSet, ElementId, LocationId, Resource};
    use crate::sim::types::SimDemand;

    fn record(resource: &Arc<Resource>, amount: f64) -> SimDemand {
        let mut demands = DemandSet::new();
        demands.add_amount(resource, amount);
        SimDemand {
            time: 0.0,
            location: LocationId(1),
            element: Some(ElementId(2)),
            demands,
        }
    }

    #[test]
    fn unsatisfied_mass_grouped_by_base_class() {
        let water = Arc::new(Resource::continuous(1, "Water", ClassOfSupply::COS201));
        let food = Arc::new(Resource::continuous(2, "Food", ClassOfSupply::COS2));
        let filter = Arc::new(Resource::item(3, "Filter", ClassOfSupply::COS4011, 2.0));
        let report = DemandReport {
            unsatisfied: vec![record(&water, 3.0), record(&food, 1.0), record(&filter, 2.0)],
            ..DemandReport::default()
        };
        let summary = LogisticsSummary::from_reports(&report, &Manifest::default());
        assert_eq!(summary.unsatisfied_mass, 8.0);
        assert_eq!(summary.unsatisfied_by_class.get(&ClassOfSupply::COS2), Some(&4.0));
        assert_eq!(summary.unsatisfied_by_class.get(&ClassOfSupply::COS4), Some(&4.0));
    }

    #[test]
    fn empty_run() {
        let summary = LogisticsSummary::from_reports(&DemandReport::default(), &Manifest::default());
        assert_eq!(summary.container_count, 0);
        assert_eq!(summary.peak_carrier_utilization, 0.0);
        assert_eq!(summary.gap_count, 0);
    }

    #[test]
    fn display_has_header() {
        let summary = LogisticsSummary::from_reports(&DemandReport::default(), &Manifest::default());
        let text = summary.to_string();
        assert!(text.starts_with("--- Logistics Summary ---"));
        assert!(text.ends_with("Gaps:                  0"));
    }
}

//! Packing and manifesting entry point.

use tracing::info;

use crate::config::ScenarioConfig;
use crate::error::{LogisticsError, Result};
use crate::sim::{CancelToken, DemandReport};

use super::catalog::ContainerCatalog;
use super::manifesting;
use super::packing::{self, Packer};
use super::types::Manifest;

/// Packs the aggregated demand of a [`DemandReport`] into containers and
/// manifests the containers onto the carriers of its supply edges.
///
/// The engine only reads the report, so it can be rerun with different
/// catalogs or configurations without repeating the simulation.
pub struct ManifestEngine<'a> {
    config: &'a ScenarioConfig,
    catalog: &'a ContainerCatalog,
    cancel: CancelToken,
}

impl<'a> ManifestEngine<'a> {
    pub fn new(config: &'a ScenarioConfig, catalog: &'a ContainerCatalog) -> Self {
        Self {
            config,
            catalog,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `token` to stop the run between packing groups.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Packs, manifests and collects gaps.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid parameters or a container
    /// type with non-positive capacity, and [`LogisticsError::Cancelled`] if
    /// the token fires. Demand that cannot be packed or delivered in time is
    /// reported in [`Manifest::gaps`], never as an error.
    pub fn run(&self, report: &DemandReport) -> Result<Manifest> {
        if let Some(err) = LogisticsError::from_validation(self.config.validate()) {
            return Err(err);
        }
        self.catalog.validate()?;

        let needs = packing::needs(report);
        info!(needs = needs.len(), "packing started");

        let mut packer = Packer::new(self.config, self.catalog);
        for need in &needs {
            packer.pack(need, &self.cancel)?;
        }
        let (mut containers, unpacked) = packer.finish();
        self.cancel.check()?;

        let carriers = manifesting::manifest(&mut containers, report, self.config);
        let actions = manifesting::actions(&carriers, report);
        let gaps = manifesting::gaps(&containers, unpacked);
        let manifest = Manifest {
            containers,
            carriers,
            actions,
            gaps,
        };

        info!(
            containers = manifest.containers.len(),
            unmanifested = manifest.unmanifested().count(),
            gaps = manifest.gaps.len(),
            "manifest finished"
        );
        Ok(manifest)
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Multi-region deployment pipeline.
//!
//! The [`Orchestrator`] walks the configured regions strictly one after
//! another, in input order. Each region runs the same fixed sequence of steps:
//!
//! 1. **Cluster** - [`bootstrap::ClusterBootstrapper`] ensures an active,
//!    federated, reachable cluster
//! 2. **Add-ons** - [`components::ComponentInstaller`] installs the shared
//!    platform components, binding identities through
//!    [`credentials::CredentialProvisioner`]
//! 3. **Webhook** - [`webhook::WebhookDeployer`] deploys the service release and
//!    waits for readiness
//!
//! The first failing step aborts the whole run; regions already processed stay
//! as they are and later regions are not touched. Re-running converges because
//! every step is individually idempotent.
//!
//! Failover routing ([`failover::FailoverController`]) is a separate invocation,
//! run once two regional endpoints are live.
//!
//! # Example
//!
//! ```rust,no_run
//! use admission_fleet::command::ProcessRunner;
//! use admission_fleet::config::{ImageRef, OrchestratorConfig};
//! use admission_fleet::orchestrator::Orchestrator;
//! use admission_fleet::providers::Providers;
//! use std::sync::Arc;
//!
//! async fn deploy() -> anyhow::Result<()> {
//!     let image = ImageRef {
//!         registry: "ghcr.io/acme".to_string(),
//!         name: "admission-webhook".to_string(),
//!         tag: "1.4.2".to_string(),
//!     };
//!     let config = OrchestratorConfig::new(
//!         vec!["us-east-1".to_string(), "us-west-2".to_string()],
//!         "webhook",
//!         "webhook-system",
//!         "example.com",
//!         image,
//!     );
//!     let providers = Providers::aws(Arc::new(ProcessRunner::new()));
//!
//!     Orchestrator::new(config, providers).run().await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod components;
pub mod credentials;
pub mod failover;
pub mod policies;
pub mod tls;
pub mod values;
pub mod webhook;


use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{OrchestratorConfig, Region};
use crate::errors::FleetError;
use crate::metrics::record_region_outcome;
use crate::providers::Providers;
use bootstrap::{ClusterBootstrapper, ClusterOutcome};
use components::{AddonReport, ComponentInstaller};
use credentials::CredentialProvisioner;
use webhook::{DeploymentReport, WebhookDeployer};

/// What one region's pipeline did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionReport {
    /// Region code
    pub region: String,
    /// Cluster name
    pub cluster: String,
    /// Public regional hostname
    pub hostname: String,
    /// Whether the cluster was created by this run
    pub cluster_outcome: ClusterOutcome,
    /// Per-add-on outcomes, in install order
    pub addons: Vec<AddonReport>,
    /// Webhook deployment outcome
    pub deployment: DeploymentReport,
}

/// Drives every region through bootstrap, add-ons and webhook deployment.
pub struct Orchestrator {
    config: OrchestratorConfig,
    bootstrapper: ClusterBootstrapper,
    components: ComponentInstaller,
    deployer: WebhookDeployer,
}

impl Orchestrator {
    /// Wire the pipeline components over `providers`.
    ///
    /// All regions share one [`CredentialProvisioner`], so a shared policy is
    /// looked up or created once per run.
    #[must_use]
    pub fn new(config: OrchestratorConfig, providers: Providers) -> Self {
        let credentials = Arc::new(CredentialProvisioner::new(providers.identity));
        Self {
            config,
            bootstrapper: ClusterBootstrapper::new(providers.clusters),
            components: ComponentInstaller::new(providers.installer.clone(), credentials),
            deployer: WebhookDeployer::new(
                providers.installer,
                providers.certificates,
                providers.cluster_api,
            ),
        }
    }

    /// Run the pipeline for every configured region, in order.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Config`] for an invalid configuration (before any
    /// external call), otherwise the first step error wrapped with its region.
    pub async fn run(&self) -> Result<Vec<RegionReport>, FleetError> {
        let regions = self.config.regions()?;
        info!(
            regions = regions.len(),
            image = %self.config.image,
            namespace = %self.config.namespace,
            "Starting multi-region deployment"
        );

        let mut reports = Vec::with_capacity(regions.len());
        for region in &regions {
            match self.run_region(region).await {
                Ok(report) => {
                    record_region_outcome("success");
                    info!(
                        region = %region.code,
                        cluster = %report.cluster,
                        hostname = %report.hostname,
                        cluster_outcome = ?report.cluster_outcome,
                        release = ?report.deployment.release,
                        "Region complete"
                    );
                    reports.push(report);
                }
                Err(e) => {
                    record_region_outcome(e.reason());
                    error!(
                        region = %region.code,
                        reason = e.reason(),
                        error = %e,
                        "Region failed, aborting run"
                    );
                    return Err(e.in_region(&region.code));
                }
            }
        }

        info!(regions = reports.len(), "All regions deployed");
        Ok(reports)
    }

    async fn run_region(&self, region: &Region) -> Result<RegionReport, FleetError> {
        info!(region = %region.code, cluster = %region.cluster_name, "Ensuring cluster");
        let (cluster, cluster_outcome) = self
            .bootstrapper
            .ensure_cluster(&self.config, region)
            .await?;

        info!(region = %region.code, cluster = %cluster.name, "Installing platform components");
        let addons = self
            .components
            .install_platform_components(&self.config, region, &cluster)
            .await?;

        info!(region = %region.code, cluster = %cluster.name, "Deploying webhook");
        let deployment = self
            .deployer
            .deploy(&self.config, region, &cluster, &self.config.image)
            .await?;

        Ok(RegionReport {
            region: region.code.clone(),
            cluster: cluster.name,
            hostname: region.hostname.clone(),
            cluster_outcome,
            addons,
            deployment,
        })
    }
}

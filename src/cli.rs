// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line interface.
//!
//! Operator-facing parameters (regions, prefix, namespace, domain) are flags;
//! for `deploy` the image reference comes from the deployment environment
//! (`IMAGE_REGISTRY`, `IMAGE_NAME`, `IMAGE_TAG`). `plan` never needs it.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ImageRef, OrchestratorConfig, Region};
use crate::constants::{
    DEFAULT_ARTIFACTS_DIR, DEFAULT_CHART_REF, DEFAULT_FAILOVER_CONFIG_FILE,
    DEFAULT_FAILOVER_TTL_SECS, DEFAULT_HEALTH_CHECK_PATH, DEFAULT_NAMESPACE,
    DEFAULT_READINESS_TIMEOUT_SECS, DEFAULT_RELEASE_NAME, DEFAULT_SERVICE_NAME,
};
use crate::errors::ConfigError;
use crate::orchestrator::failover::{FailoverRequest, SecondaryHealthPolicy};

/// Multi-region admission webhook deployment and DNS failover.
#[derive(Debug, Parser)]
#[command(name = "admission-fleet", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bootstrap clusters, install add-ons and deploy the webhook in every region
    Deploy(DeployArgs),
    /// Configure health-check-driven DNS failover between two regional endpoints
    Failover(FailoverArgs),
    /// Print the clusters and hostnames a deploy would target, without calling anything
    Plan(TargetArgs),
}

/// Which regions to target and how to name what lives in them.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Region codes, processed in the given order
    #[arg(long, value_delimiter = ',', required = true)]
    pub regions: Vec<String>,

    /// Cluster name prefix; clusters are named `<prefix>-<region>`
    #[arg(long)]
    pub cluster_prefix: String,

    /// Namespace receiving the webhook release
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// DNS domain of the regional hostnames
    #[arg(long)]
    pub domain: String,

    /// Hostname label; hostnames are `<service-name>-<region>.<domain>`
    #[arg(long, default_value = DEFAULT_SERVICE_NAME)]
    pub service_name: String,
}

/// Webhook image, normally supplied by the deployment environment.
#[derive(Debug, Clone, Args)]
pub struct ImageArgs {
    /// Image registry
    #[arg(long, env = "IMAGE_REGISTRY")]
    pub image_registry: String,

    /// Image name
    #[arg(long, env = "IMAGE_NAME")]
    pub image_name: String,

    /// Image tag
    #[arg(long, env = "IMAGE_TAG")]
    pub image_tag: String,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub image: ImageArgs,

    /// Directory holding `ca.crt`, `tls.crt` and `tls.key` for the webhook
    #[arg(long, env = "TLS_BUNDLE_DIR")]
    pub tls_bundle_dir: Option<PathBuf>,

    /// Directory receiving generated manifests
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Seconds to wait for the webhook release to become ready
    #[arg(long, default_value_t = DEFAULT_READINESS_TIMEOUT_SECS)]
    pub readiness_timeout_secs: u64,

    /// Webhook chart reference
    #[arg(long, default_value = DEFAULT_CHART_REF)]
    pub chart: String,

    /// Webhook release name
    #[arg(long, default_value = DEFAULT_RELEASE_NAME)]
    pub release_name: String,

    /// Extra cluster tag as `key=value` (repeatable)
    #[arg(long = "tag", value_parser = parse_key_val)]
    pub tags: Vec<(String, String)>,

    /// Write Prometheus metrics to this file on exit
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct FailoverArgs {
    /// Global failover domain
    #[arg(long)]
    pub domain: String,

    /// Primary regional hostname
    #[arg(long)]
    pub primary: String,

    /// Secondary regional hostname
    #[arg(long)]
    pub secondary: String,

    /// Hosted zone identifier
    #[arg(long, env = "HOSTED_ZONE_ID")]
    pub zone_id: String,

    /// Health check request path
    #[arg(long, default_value = DEFAULT_HEALTH_CHECK_PATH)]
    pub health_check_path: String,

    /// TTL of both failover records
    #[arg(long, default_value_t = DEFAULT_FAILOVER_TTL_SECS)]
    pub ttl: u32,

    /// Whether the secondary record is gated by its own health check
    #[arg(long, value_enum, default_value_t = SecondaryHealthPolicy::Unmonitored)]
    pub secondary_health_check: SecondaryHealthPolicy,

    /// Where to write the failover configuration snapshot
    #[arg(long, default_value = DEFAULT_FAILOVER_CONFIG_FILE)]
    pub output: PathBuf,

    /// Write Prometheus metrics to this file on exit
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

impl TargetArgs {
    /// Configuration with defaults for everything not given on the command line.
    #[must_use]
    pub fn to_config(&self, image: ImageRef) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::new(
            self.regions.clone(),
            &self.cluster_prefix,
            &self.namespace,
            &self.domain,
            image,
        );
        config.service_name.clone_from(&self.service_name);
        config
    }

    /// Validate the target and derive its regions. Naming never depends on the image.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty region list, a blank value or a
    /// duplicate region.
    pub fn regions(&self) -> Result<Vec<Region>, ConfigError> {
        let unset = ImageRef {
            registry: String::new(),
            name: String::new(),
            tag: String::new(),
        };
        self.to_config(unset).regions()
    }
}

impl ImageArgs {
    #[must_use]
    pub fn to_image(&self) -> ImageRef {
        ImageRef {
            registry: self.image_registry.clone(),
            name: self.image_name.clone(),
            tag: self.image_tag.clone(),
        }
    }
}

impl DeployArgs {
    #[must_use]
    pub fn to_config(&self) -> OrchestratorConfig {
        let mut config = self.target.to_config(self.image.to_image());
        config.tls_bundle_dir.clone_from(&self.tls_bundle_dir);
        config.artifacts_dir.clone_from(&self.artifacts_dir);
        config.readiness_timeout = Duration::from_secs(self.readiness_timeout_secs);
        config.chart.clone_from(&self.chart);
        config.release_name.clone_from(&self.release_name);
        config.tags.extend(self.tags.iter().cloned());
        config
    }
}

impl FailoverArgs {
    #[must_use]
    pub fn to_request(&self) -> FailoverRequest {
        FailoverRequest {
            domain: self.domain.clone(),
            primary_host: self.primary.clone(),
            secondary_host: self.secondary.clone(),
            zone_id: self.zone_id.clone(),
            health_check_path: self.health_check_path.clone(),
            ttl: self.ttl,
            secondary_policy: self.secondary_health_check,
        }
    }
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Run configuration.
//!
//! An [`OrchestratorConfig`] is built once (usually from CLI arguments and the
//! environment) and passed by reference into every component. Nothing reads
//! process-wide state after that point.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ARTIFACTS_DIR, DEFAULT_CHART_REF, DEFAULT_CPU_LIMIT, DEFAULT_CPU_REQUEST,
    DEFAULT_DESIRED_NODES, DEFAULT_INSTANCE_TYPE, DEFAULT_MAX_NODES, DEFAULT_MEMORY_LIMIT,
    DEFAULT_MEMORY_REQUEST, DEFAULT_MIN_NODES, DEFAULT_READINESS_TIMEOUT_SECS, DEFAULT_RELEASE_NAME,
    DEFAULT_SERVICE_NAME, OWNER_TAG_KEY, OWNER_TAG_VALUE, REGION_TAG_KEY, WEBHOOK_METRICS_PORT,
};
use crate::errors::ConfigError;

/// A deployment target derived from an operator-supplied region code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Cloud region code (e.g. `us-east-1`)
    pub code: String,
    /// Cluster name, `<prefix>-<code>`
    pub cluster_name: String,
    /// Public regional hostname, `<service>-<code>.<domain>`
    pub hostname: String,
}

impl Region {
    /// Derive cluster name and hostname for a region.
    #[must_use]
    pub fn derive(code: &str, cluster_prefix: &str, service_name: &str, domain: &str) -> Self {
        Self {
            code: code.to_string(),
            cluster_name: format!("{cluster_prefix}-{code}"),
            hostname: format!("{service_name}-{code}.{domain}"),
        }
    }
}

/// Container image of the webhook service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Registry host (e.g. `ghcr.io/acme`)
    pub registry: String,
    /// Image name
    pub name: String,
    /// Image tag
    pub tag: String,
}

impl ImageRef {
    /// Repository part of the reference, `<registry>/<name>`.
    #[must_use]
    pub fn repository(&self) -> String {
        if self.registry.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.registry.trim_end_matches('/'), self.name)
        }
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository(), self.tag)
    }
}

/// Managed node group shape for every regional cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePoolShape {
    /// EC2 instance type
    pub instance_type: String,
    /// Minimum node count
    pub min_nodes: u32,
    /// Maximum node count
    pub max_nodes: u32,
    /// Desired node count at creation
    pub desired_nodes: u32,
}

impl Default for NodePoolShape {
    fn default() -> Self {
        Self {
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            min_nodes: DEFAULT_MIN_NODES,
            max_nodes: DEFAULT_MAX_NODES,
            desired_nodes: DEFAULT_DESIRED_NODES,
        }
    }
}

impl NodePoolShape {
    /// Check `min <= desired <= max` and `max > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNodePool`] when the bounds are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes == 0
            || self.min_nodes > self.desired_nodes
            || self.desired_nodes > self.max_nodes
        {
            return Err(ConfigError::InvalidNodePool {
                min: self.min_nodes,
                desired: self.desired_nodes,
                max: self.max_nodes,
            });
        }
        Ok(())
    }
}

/// Resource defaults the webhook injects into workloads missing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefaults {
    /// Default CPU request
    pub default_cpu_request: String,
    /// Default CPU limit
    pub default_cpu_limit: String,
    /// Default memory request
    pub default_memory_request: String,
    /// Default memory limit
    pub default_memory_limit: String,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            default_cpu_request: DEFAULT_CPU_REQUEST.to_string(),
            default_cpu_limit: DEFAULT_CPU_LIMIT.to_string(),
            default_memory_request: DEFAULT_MEMORY_REQUEST.to_string(),
            default_memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
        }
    }
}

/// Configuration contract consumed by the deployed webhook service.
///
/// Passed through to the release untouched; the orchestrator never evaluates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSettings {
    /// Service log level
    pub log_level: String,
    /// Expose service metrics
    pub metrics_enabled: bool,
    /// Service metrics port
    pub metrics_port: u16,
    /// Enable the validating webhook
    pub validation_enabled: bool,
    /// Enable the mutating webhook
    pub mutation_enabled: bool,
    /// Registries images may be pulled from
    pub allowed_registries: Vec<String>,
    /// Reject images tagged `latest`
    pub deny_latest_tag: bool,
    /// Require `runAsNonRoot`
    pub enforce_non_root: bool,
    /// Require a read-only root filesystem
    pub enforce_readonly_root: bool,
    /// Reject privileged containers
    pub enforce_privileged: bool,
    /// Reject host networking
    pub enforce_host_network: bool,
    /// Require resource limits
    pub enforce_resource_limits: bool,
    /// Defaults injected when limits are missing
    #[serde(flatten)]
    pub resource_defaults: ResourceDefaults,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_port: WEBHOOK_METRICS_PORT,
            validation_enabled: true,
            mutation_enabled: true,
            allowed_registries: vec!["docker.io".to_string(), "gcr.io".to_string()],
            deny_latest_tag: true,
            enforce_non_root: true,
            enforce_readonly_root: true,
            enforce_privileged: true,
            enforce_host_network: true,
            enforce_resource_limits: true,
            resource_defaults: ResourceDefaults::default(),
        }
    }
}

/// Immutable configuration for one orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Region codes, processed in this order
    pub regions: Vec<String>,
    /// Cluster name prefix
    pub cluster_prefix: String,
    /// Namespace receiving the webhook release
    pub namespace: String,
    /// DNS domain for regional hostnames
    pub domain: String,
    /// Hostname label of the regional endpoints
    pub service_name: String,
    /// Webhook image
    pub image: ImageRef,
    /// Node group shape
    pub node_pool: NodePoolShape,
    /// Readiness wait for the webhook release
    pub readiness_timeout: Duration,
    /// Webhook chart reference
    pub chart: String,
    /// Webhook release name
    pub release_name: String,
    /// Directory holding `ca.crt`, `tls.crt` and `tls.key` for the webhook
    pub tls_bundle_dir: Option<PathBuf>,
    /// Directory receiving generated manifests
    pub artifacts_dir: PathBuf,
    /// Extra tags applied to clusters
    pub tags: BTreeMap<String, String>,
    /// Service configuration payload
    pub webhook: WebhookSettings,
}

impl OrchestratorConfig {
    /// Configuration with defaults for everything but the operator-facing parameters.
    #[must_use]
    pub fn new(
        regions: Vec<String>,
        cluster_prefix: impl Into<String>,
        namespace: impl Into<String>,
        domain: impl Into<String>,
        image: ImageRef,
    ) -> Self {
        Self {
            regions,
            cluster_prefix: cluster_prefix.into(),
            namespace: namespace.into(),
            domain: domain.into(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            image,
            node_pool: NodePoolShape::default(),
            readiness_timeout: Duration::from_secs(DEFAULT_READINESS_TIMEOUT_SECS),
            chart: DEFAULT_CHART_REF.to_string(),
            release_name: DEFAULT_RELEASE_NAME.to_string(),
            tls_bundle_dir: None,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            tags: BTreeMap::new(),
            webhook: WebhookSettings::default(),
        }
    }

    /// Check the configuration and derive the regions in input order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty or duplicated region list, blank
    /// naming parameters, or an inconsistent node pool.
    pub fn regions(&self) -> Result<Vec<Region>, ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }
        for (name, value) in [
            ("cluster_prefix", &self.cluster_prefix),
            ("namespace", &self.namespace),
            ("domain", &self.domain),
            ("service_name", &self.service_name),
            ("release_name", &self.release_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue(name));
            }
        }
        self.node_pool.validate()?;

        let mut seen = HashSet::new();
        let mut regions = Vec::with_capacity(self.regions.len());
        for code in &self.regions {
            let code = code.trim();
            if code.is_empty() {
                return Err(ConfigError::EmptyRegion);
            }
            if !seen.insert(code.to_string()) {
                return Err(ConfigError::DuplicateRegion(code.to_string()));
            }
            regions.push(Region::derive(
                code,
                &self.cluster_prefix,
                &self.service_name,
                &self.domain,
            ));
        }
        Ok(regions)
    }

    /// Tags applied to a region's cluster: ownership plus operator extras.
    #[must_use]
    pub fn cluster_tags(&self, region: &Region) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.insert(OWNER_TAG_KEY.to_string(), OWNER_TAG_VALUE.to_string());
        tags.insert(REGION_TAG_KEY.to_string(), region.code.clone());
        tags
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

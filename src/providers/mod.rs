// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Interfaces to the external control planes the orchestrator drives.
//!
//! Each trait is one boundary with its own consistency model and its own
//! notion of "already exists". Orchestration components only ever hold
//! `Arc<dyn Trait>` handles (bundled in [`Providers`]) so tests can substitute
//! in-memory fakes without touching a live cloud account.
//!
//! | Trait | Production implementation |
//! |-------|---------------------------|
//! | [`ClusterProvisioner`] | [`eksctl::EksctlProvisioner`] |
//! | [`PackageInstaller`] | [`helm::HelmInstaller`] |
//! | [`IdentityProvider`] | [`iam::IamProvider`] |
//! | [`DnsProvider`] | [`route53::Route53Provider`] |
//! | [`CertificateCatalog`] | [`acm::AcmCatalog`] |
//! | [`ClusterApi`] | [`kubernetes::KubeClusterApi`] |
//! | [`HostResolver`] | [`resolver::SystemResolver`] |

pub mod acm;
pub mod eksctl;
pub mod helm;
pub mod iam;
pub mod kubernetes;
pub mod resolver;
pub mod route53;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::command::CommandRunner;
use crate::config::NodePoolShape;
use crate::errors::{
    CertificateError, ClusterApiError, ClusterError, DnsError, IdentityError, InstallerError,
};

// ============================================================================
// Cluster provisioner
// ============================================================================

/// Reference to a provisioned, reachable compute cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    /// Cluster name
    pub name: String,
    /// Region code
    pub region: String,
    /// Kubeconfig context refreshed for this cluster
    pub kube_context: String,
}

/// What the provisioner reports about an existing cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescription {
    /// Cluster name
    pub name: String,
    /// Provisioner status (e.g. `ACTIVE`, `CREATING`)
    pub status: String,
    /// API server endpoint, once known
    pub endpoint: Option<String>,
}

/// Desired shape of a new cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    /// Cluster name
    pub name: String,
    /// Region code
    pub region: String,
    /// Node group shape
    pub node_pool: NodePoolShape,
    /// Ownership tags
    pub tags: BTreeMap<String, String>,
}

/// Creates clusters and refreshes local access to them.
#[async_trait]
pub trait ClusterProvisioner: Send + Sync {
    /// Describe a cluster, or `None` if no cluster of that name exists.
    async fn describe_cluster(
        &self,
        name: &str,
        region: &str,
    ) -> Result<Option<ClusterDescription>, ClusterError>;

    /// Create a cluster with workload-identity federation enabled.
    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<(), ClusterError>;

    /// Associate the cluster's OIDC issuer with the cloud identity provider.
    ///
    /// Must be safe to call when the association already exists.
    async fn associate_oidc_provider(&self, name: &str, region: &str) -> Result<(), ClusterError>;

    /// Refresh local credentials and return the kubeconfig context to use.
    async fn update_kubeconfig(&self, name: &str, region: &str) -> Result<String, ClusterError>;
}

// ============================================================================
// Package installer
// ============================================================================

/// One install-or-upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Release name
    pub release: String,
    /// Chart reference
    pub chart: String,
    /// Target namespace
    pub namespace: String,
    /// Create the namespace if missing
    pub create_namespace: bool,
    /// Values file staged on disk
    pub values_file: Option<PathBuf>,
    /// Individual `--set` overrides, in order
    pub set_values: Vec<(String, String)>,
    /// Readiness wait; `None` returns as soon as manifests are accepted
    pub wait: Option<Duration>,
}

impl ReleaseRequest {
    /// Request with no values, no namespace creation and no wait.
    #[must_use]
    pub fn new(
        release: impl Into<String>,
        chart: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            release: release.into(),
            chart: chart.into(),
            namespace: namespace.into(),
            create_namespace: false,
            values_file: None,
            set_values: Vec::new(),
            wait: None,
        }
    }

    /// Add a `--set key=value` override.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_values.push((key.into(), value.into()));
        self
    }
}

/// Result of an install-or-upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ReleaseOutcome {
    /// Release did not exist and was installed
    Installed {
        /// New revision
        revision: u32,
    },
    /// Release existed and was upgraded in place
    Upgraded {
        /// New revision
        revision: u32,
    },
}

/// Installs packaged workloads into a cluster.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Register (or refresh) a chart repository.
    async fn add_repository(&self, name: &str, url: &str) -> Result<(), InstallerError>;

    /// Current revision of a release, or `None` if it is not installed.
    async fn release_revision(
        &self,
        cluster: &ClusterHandle,
        release: &str,
        namespace: &str,
    ) -> Result<Option<u32>, InstallerError>;

    /// Install the release if absent, upgrade it in place if present.
    async fn install_or_upgrade(
        &self,
        cluster: &ClusterHandle,
        request: &ReleaseRequest,
    ) -> Result<ReleaseOutcome, InstallerError>;

    /// Declaratively apply a remote manifest.
    async fn apply_manifest_url(
        &self,
        cluster: &ClusterHandle,
        url: &str,
    ) -> Result<(), InstallerError>;
}

// ============================================================================
// Identity provider
// ============================================================================

/// A policy as listed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    /// Policy name
    pub name: String,
    /// Policy ARN
    pub arn: String,
    /// Version holding the active document
    pub default_version_id: Option<String>,
}

/// Resolved reference to a shared identity policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRef {
    /// Policy name
    pub name: String,
    /// Policy ARN
    pub arn: String,
    /// The stored document differs from the intended one (never reconciled)
    pub drifted: bool,
}

/// Binding of an in-cluster service account to a policy through a cloud role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentityBinding {
    /// Cluster name
    pub cluster: String,
    /// Region code
    pub region: String,
    /// Service account namespace
    pub namespace: String,
    /// Service account name
    pub service_account: String,
    /// Cloud role assumed by the service account
    pub role_name: String,
    /// Attached policy ARN
    pub policy_arn: String,
}

/// Manages permission documents and workload identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// List every customer-managed policy named `name`.
    async fn list_policies(&self, name: &str) -> Result<Vec<PolicySummary>, IdentityError>;

    /// Create a policy; fails with [`IdentityError::PolicyConflict`] if the name is taken.
    async fn create_policy(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<PolicySummary, IdentityError>;

    /// Stored document of an existing policy, if the provider exposes it.
    async fn policy_document(
        &self,
        policy: &PolicySummary,
    ) -> Result<Option<serde_json::Value>, IdentityError>;

    /// Create or update the service account binding; never duplicates it.
    async fn upsert_service_account(
        &self,
        binding: &ServiceIdentityBinding,
    ) -> Result<(), IdentityError>;
}

// ============================================================================
// DNS and health checks
// ============================================================================

/// Probe protocol of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckProtocol {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
}

/// Configuration of one endpoint health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Probed hostname
    pub fqdn: String,
    /// Probed port
    pub port: u16,
    /// Probe protocol
    pub protocol: HealthCheckProtocol,
    /// Request path
    pub resource_path: String,
    /// Seconds between probes
    pub request_interval_secs: u32,
    /// Consecutive failures before the endpoint is unhealthy
    pub failure_threshold: u32,
    /// Send SNI during the TLS handshake
    pub enable_sni: bool,
}

/// Failover role of a DNS record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailoverRole {
    /// Served while its health check is healthy
    Primary,
    /// Served when the primary is withdrawn
    Secondary,
}

impl FailoverRole {
    /// Provider spelling of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::Secondary => "SECONDARY",
        }
    }
}

impl std::fmt::Display for FailoverRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record set change action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Fail if the record exists
    Create,
    /// Create or replace
    Upsert,
    /// Remove
    Delete,
}

/// One failover record set change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    /// Change action
    pub action: ChangeAction,
    /// Record name (the failover domain)
    pub name: String,
    /// Record type (e.g. `A`)
    pub record_type: String,
    /// Identifier distinguishing records sharing `name`
    pub set_identifier: String,
    /// Failover role
    pub failover: FailoverRole,
    /// TTL in seconds
    pub ttl: u32,
    /// Record value
    pub value: String,
    /// Health check gating this record
    pub health_check_id: Option<String>,
}

/// Manages health checks and record sets in a hosted zone.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create a health check and return its provider-assigned ID.
    ///
    /// Repeating a call with the same `caller_reference` and configuration must
    /// not create a second health check.
    async fn create_health_check(
        &self,
        caller_reference: &str,
        config: &HealthCheckConfig,
    ) -> Result<String, DnsError>;

    /// Apply a batch of record changes atomically.
    async fn change_record_sets(
        &self,
        zone_id: &str,
        changes: &[RecordChange],
    ) -> Result<(), DnsError>;
}

// ============================================================================
// Certificates
// ============================================================================

/// An issued certificate as listed by the certificate catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Certificate ARN
    pub arn: String,
    /// Primary domain name
    pub domain_name: String,
    /// Subject alternative names
    pub subject_alternative_names: Vec<String>,
}

/// Lists issued certificates per region.
#[async_trait]
pub trait CertificateCatalog: Send + Sync {
    /// Every issued certificate in `region`.
    async fn list_certificates(
        &self,
        region: &str,
    ) -> Result<Vec<CertificateSummary>, CertificateError>;
}

// ============================================================================
// In-cluster API
// ============================================================================

/// Whether an idempotent create found the object already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnsureOutcome {
    /// Object was created
    Created,
    /// Object already existed
    Existing,
}

/// Direct operations against a cluster's control plane.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a namespace, ignoring "already exists".
    async fn ensure_namespace(
        &self,
        cluster: &ClusterHandle,
        namespace: &str,
    ) -> Result<EnsureOutcome, ClusterApiError>;

    /// Create or update a secret in its own namespace.
    async fn apply_secret(
        &self,
        cluster: &ClusterHandle,
        secret: &Secret,
    ) -> Result<(), ClusterApiError>;
}

// ============================================================================
// Host resolution
// ============================================================================

/// Resolves endpoint hostnames at configuration time.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Current addresses of `host`.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError>;
}

// ============================================================================
// Bundle
// ============================================================================

/// Every boundary the orchestrator needs, ready for injection.
#[derive(Clone)]
pub struct Providers {
    /// Cluster provisioner
    pub clusters: Arc<dyn ClusterProvisioner>,
    /// Package installer
    pub installer: Arc<dyn PackageInstaller>,
    /// Identity provider
    pub identity: Arc<dyn IdentityProvider>,
    /// DNS and health checks
    pub dns: Arc<dyn DnsProvider>,
    /// Certificate catalog
    pub certificates: Arc<dyn CertificateCatalog>,
    /// In-cluster API
    pub cluster_api: Arc<dyn ClusterApi>,
    /// Host resolver
    pub resolver: Arc<dyn HostResolver>,
}

impl Providers {
    /// Production providers backed by the `eksctl`, `aws`, `helm` and `kubectl`
    /// CLIs plus a direct Kubernetes client.
    #[must_use]
    pub fn aws(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            clusters: Arc::new(eksctl::EksctlProvisioner::new(runner.clone())),
            installer: Arc::new(helm::HelmInstaller::new(runner.clone())),
            identity: Arc::new(iam::IamProvider::new(runner.clone())),
            dns: Arc::new(route53::Route53Provider::new(runner.clone())),
            certificates: Arc::new(acm::AcmCatalog::new(runner)),
            cluster_api: Arc::new(kubernetes::KubeClusterApi::new()),
            resolver: Arc::new(resolver::SystemResolver),
        }
    }
}

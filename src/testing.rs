// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes for every provider boundary.
//!
//! Each fake records the calls it receives so tests can assert on ordering
//! and call counts without any live external system.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::command::{CommandError, CommandOutput, CommandRunner};
use crate::constants::CLUSTER_STATUS_ACTIVE;
use crate::errors::{
    CertificateError, ClusterApiError, ClusterError, DnsError, IdentityError, InstallerError,
};
use crate::providers::{
    CertificateCatalog, CertificateSummary, ClusterApi, ClusterDescription, ClusterHandle,
    ClusterProvisioner, ClusterSpec, DnsProvider, EnsureOutcome, HealthCheckConfig, HostResolver,
    IdentityProvider, PackageInstaller, PolicySummary, Providers, RecordChange, ReleaseOutcome,
    ReleaseRequest, ServiceIdentityBinding,
};

// ============================================================================
// Command runner
// ============================================================================

/// Runner that replays queued responses and records every invocation.
///
/// When the queue is empty, calls succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<Result<CommandOutput, CommandError>>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful response with `stdout`.
    pub fn push_ok(&self, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(CommandOutput::stdout(stdout)));
    }

    /// Queue a non-zero exit with `stderr`.
    pub fn push_err(&self, stderr: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(CommandError::Failed {
                program: "scripted".to_string(),
                status: 255,
                stderr: stderr.to_string(),
            }));
    }

    /// Every `(program, args)` pair received so far.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput::default()))
    }
}

// ============================================================================
// Cluster provisioner
// ============================================================================

/// Provisioner keeping cluster status by name.
#[derive(Default)]
pub struct FakeClusters {
    clusters: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    fail_create: Mutex<bool>,
}

impl FakeClusters {
    /// Pre-existing cluster with `status`.
    pub fn with_cluster(&self, name: &str, status: &str) {
        self.clusters
            .lock()
            .unwrap()
            .insert(name.to_string(), status.to_string());
    }

    pub fn fail_creates(&self) {
        *self.fail_create.lock().unwrap() = true;
    }

    /// Calls as `operation:cluster` strings, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls of one operation, in order.
    pub fn calls_of(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{operation}:");
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(ToString::to_string))
            .collect()
    }

    fn record(&self, operation: &str, name: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{name}"));
    }
}

#[async_trait]
impl ClusterProvisioner for FakeClusters {
    async fn describe_cluster(
        &self,
        name: &str,
        _region: &str,
    ) -> Result<Option<ClusterDescription>, ClusterError> {
        self.record("describe", name);
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .get(name)
            .map(|status| ClusterDescription {
                name: name.to_string(),
                status: status.clone(),
                endpoint: Some(format!("https://{name}.eks.example")),
            }))
    }

    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<(), ClusterError> {
        self.record("create", &spec.name);
        if *self.fail_create.lock().unwrap() {
            return Err(ClusterError::CreationFailed {
                cluster: spec.name.clone(),
                region: spec.region.clone(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.with_cluster(&spec.name, CLUSTER_STATUS_ACTIVE);
        Ok(())
    }

    async fn associate_oidc_provider(&self, name: &str, _region: &str) -> Result<(), ClusterError> {
        self.record("associate", name);
        Ok(())
    }

    async fn update_kubeconfig(&self, name: &str, _region: &str) -> Result<String, ClusterError> {
        self.record("kubeconfig", name);
        Ok(name.to_string())
    }
}

// ============================================================================
// Package installer
// ============================================================================

/// A release request as observed by [`FakeInstaller`].
#[derive(Debug, Clone)]
pub struct RecordedRelease {
    /// Target cluster name
    pub cluster: String,
    /// The request
    pub request: ReleaseRequest,
    /// Contents of the values file at the time of the call
    pub values: Option<String>,
}

/// Installer tracking release revisions per (cluster, namespace, release).
#[derive(Default)]
pub struct FakeInstaller {
    revisions: Mutex<HashMap<(String, String, String), u32>>,
    releases: Mutex<Vec<RecordedRelease>>,
    repositories: Mutex<Vec<String>>,
    manifests: Mutex<Vec<String>>,
    timeout_release: Mutex<Option<String>>,
}

impl FakeInstaller {
    /// Make every install of `release` fail with a readiness timeout.
    pub fn time_out(&self, release: &str) {
        *self.timeout_release.lock().unwrap() = Some(release.to_string());
    }

    pub fn releases(&self) -> Vec<RecordedRelease> {
        self.releases.lock().unwrap().clone()
    }

    /// Release names in install order.
    pub fn release_names(&self) -> Vec<String> {
        self.releases()
            .into_iter()
            .map(|r| r.request.release)
            .collect()
    }

    /// The last request for `release`.
    pub fn last(&self, release: &str) -> Option<RecordedRelease> {
        self.releases()
            .into_iter()
            .rev()
            .find(|r| r.request.release == release)
    }

    pub fn repositories(&self) -> Vec<String> {
        self.repositories.lock().unwrap().clone()
    }

    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().unwrap().clone()
    }

    /// Values files handed to the installer, in order.
    pub fn values_paths(&self) -> Vec<PathBuf> {
        self.releases()
            .into_iter()
            .filter_map(|r| r.request.values_file)
            .collect()
    }
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    async fn add_repository(&self, name: &str, _url: &str) -> Result<(), InstallerError> {
        self.repositories.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn release_revision(
        &self,
        cluster: &ClusterHandle,
        release: &str,
        namespace: &str,
    ) -> Result<Option<u32>, InstallerError> {
        let key = (
            cluster.name.clone(),
            namespace.to_string(),
            release.to_string(),
        );
        Ok(self.revisions.lock().unwrap().get(&key).copied())
    }

    async fn install_or_upgrade(
        &self,
        cluster: &ClusterHandle,
        request: &ReleaseRequest,
    ) -> Result<ReleaseOutcome, InstallerError> {
        let values = request
            .values_file
            .as_ref()
            .and_then(|path| std::fs::read_to_string(path).ok());
        self.releases.lock().unwrap().push(RecordedRelease {
            cluster: cluster.name.clone(),
            request: request.clone(),
            values,
        });

        if self.timeout_release.lock().unwrap().as_deref() == Some(request.release.as_str()) {
            return Err(InstallerError::ReadinessTimeout {
                release: request.release.clone(),
                namespace: request.namespace.clone(),
                cluster: cluster.name.clone(),
                timeout_secs: request.wait.map_or(0, |w| w.as_secs()),
            });
        }

        let key = (
            cluster.name.clone(),
            request.namespace.clone(),
            request.release.clone(),
        );
        let mut revisions = self.revisions.lock().unwrap();
        let outcome = match revisions.get(&key).copied() {
            Some(current) => ReleaseOutcome::Upgraded {
                revision: current + 1,
            },
            None => ReleaseOutcome::Installed { revision: 1 },
        };
        let revision = match outcome {
            ReleaseOutcome::Installed { revision } | ReleaseOutcome::Upgraded { revision } => {
                revision
            }
        };
        revisions.insert(key, revision);
        Ok(outcome)
    }

    async fn apply_manifest_url(
        &self,
        _cluster: &ClusterHandle,
        url: &str,
    ) -> Result<(), InstallerError> {
        self.manifests.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ============================================================================
// Identity provider
// ============================================================================

/// Identity provider with a flat policy list and keyed bindings.
#[derive(Default)]
pub struct FakeIdentity {
    policies: Mutex<Vec<PolicySummary>>,
    documents: Mutex<HashMap<String, serde_json::Value>>,
    creates: Mutex<usize>,
    concurrent_winner: Mutex<Option<PolicySummary>>,
    bindings: Mutex<BTreeMap<(String, String, String), ServiceIdentityBinding>>,
    upserts: Mutex<usize>,
}

impl FakeIdentity {
    /// Pre-existing policy with a stored document.
    pub fn with_policy(&self, name: &str, arn: &str, document: serde_json::Value) {
        self.policies.lock().unwrap().push(PolicySummary {
            name: name.to_string(),
            arn: arn.to_string(),
            default_version_id: Some("v1".to_string()),
        });
        self.documents
            .lock()
            .unwrap()
            .insert(arn.to_string(), document);
    }

    /// The next create loses a race: `arn` appears and the create conflicts.
    pub fn lose_next_create(&self, name: &str, arn: &str) {
        *self.concurrent_winner.lock().unwrap() = Some(PolicySummary {
            name: name.to_string(),
            arn: arn.to_string(),
            default_version_id: Some("v1".to_string()),
        });
    }

    pub fn create_calls(&self) -> usize {
        *self.creates.lock().unwrap()
    }

    pub fn upsert_calls(&self) -> usize {
        *self.upserts.lock().unwrap()
    }

    /// Distinct bindings currently held.
    pub fn bindings(&self) -> Vec<ServiceIdentityBinding> {
        self.bindings.lock().unwrap().values().cloned().collect()
    }

    pub fn policy_count(&self, name: &str) -> usize {
        self.policies
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.name == name)
            .count()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn list_policies(&self, name: &str) -> Result<Vec<PolicySummary>, IdentityError> {
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.name == name)
            .cloned()
            .collect())
    }

    async fn create_policy(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<PolicySummary, IdentityError> {
        *self.creates.lock().unwrap() += 1;

        if let Some(winner) = self.concurrent_winner.lock().unwrap().take() {
            self.policies.lock().unwrap().push(winner);
            return Err(IdentityError::PolicyConflict {
                name: name.to_string(),
            });
        }

        let mut policies = self.policies.lock().unwrap();
        if policies.iter().any(|p| p.name == name) {
            return Err(IdentityError::PolicyConflict {
                name: name.to_string(),
            });
        }
        let summary = PolicySummary {
            name: name.to_string(),
            arn: format!("arn:aws:iam::123456789012:policy/{name}"),
            default_version_id: Some("v1".to_string()),
        };
        policies.push(summary.clone());
        self.documents
            .lock()
            .unwrap()
            .insert(summary.arn.clone(), document.clone());
        Ok(summary)
    }

    async fn policy_document(
        &self,
        policy: &PolicySummary,
    ) -> Result<Option<serde_json::Value>, IdentityError> {
        Ok(self.documents.lock().unwrap().get(&policy.arn).cloned())
    }

    async fn upsert_service_account(
        &self,
        binding: &ServiceIdentityBinding,
    ) -> Result<(), IdentityError> {
        *self.upserts.lock().unwrap() += 1;
        self.bindings.lock().unwrap().insert(
            (
                binding.cluster.clone(),
                binding.namespace.clone(),
                binding.service_account.clone(),
            ),
            binding.clone(),
        );
        Ok(())
    }
}

// ============================================================================
// DNS
// ============================================================================

/// A health check as created on [`FakeDns`].
#[derive(Debug, Clone)]
pub struct RecordedHealthCheck {
    pub id: String,
    pub caller_reference: String,
    pub config: HealthCheckConfig,
}

/// DNS provider honouring caller-reference idempotency.
#[derive(Default)]
pub struct FakeDns {
    health_checks: Mutex<Vec<RecordedHealthCheck>>,
    create_calls: Mutex<usize>,
    batches: Mutex<Vec<(String, Vec<RecordChange>)>>,
    fail_changes: Mutex<bool>,
}

impl FakeDns {
    pub fn fail_changes(&self) {
        *self.fail_changes.lock().unwrap() = true;
    }

    /// Distinct health checks held by the provider.
    pub fn health_checks(&self) -> Vec<RecordedHealthCheck> {
        self.health_checks.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        *self.create_calls.lock().unwrap()
    }

    /// Change batches as `(zone, changes)`, in order.
    pub fn batches(&self) -> Vec<(String, Vec<RecordChange>)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsProvider for FakeDns {
    async fn create_health_check(
        &self,
        caller_reference: &str,
        config: &HealthCheckConfig,
    ) -> Result<String, DnsError> {
        *self.create_calls.lock().unwrap() += 1;
        let mut checks = self.health_checks.lock().unwrap();
        if let Some(existing) = checks
            .iter()
            .find(|c| c.caller_reference == caller_reference)
        {
            if existing.config == *config {
                return Ok(existing.id.clone());
            }
            return Err(DnsError::HealthCheckConflict {
                caller_reference: caller_reference.to_string(),
            });
        }
        let id = format!("hc-{}", checks.len() + 1);
        checks.push(RecordedHealthCheck {
            id: id.clone(),
            caller_reference: caller_reference.to_string(),
            config: config.clone(),
        });
        Ok(id)
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        changes: &[RecordChange],
    ) -> Result<(), DnsError> {
        if *self.fail_changes.lock().unwrap() {
            return Err(DnsError::RecordChangeFailed {
                zone: zone_id.to_string(),
                name: changes.first().map(|c| c.name.clone()).unwrap_or_default(),
                reason: "InvalidChangeBatch".to_string(),
            });
        }
        self.batches
            .lock()
            .unwrap()
            .push((zone_id.to_string(), changes.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Certificates, cluster API, resolver
// ============================================================================

/// Certificate catalog keyed by region.
#[derive(Default)]
pub struct FakeCertificates {
    by_region: Mutex<HashMap<String, Vec<CertificateSummary>>>,
}

impl FakeCertificates {
    pub fn add(&self, region: &str, arn: &str, domain_name: &str, sans: &[&str]) {
        self.by_region
            .lock()
            .unwrap()
            .entry(region.to_string())
            .or_default()
            .push(CertificateSummary {
                arn: arn.to_string(),
                domain_name: domain_name.to_string(),
                subject_alternative_names: sans.iter().map(ToString::to_string).collect(),
            });
    }
}

#[async_trait]
impl CertificateCatalog for FakeCertificates {
    async fn list_certificates(
        &self,
        region: &str,
    ) -> Result<Vec<CertificateSummary>, CertificateError> {
        Ok(self
            .by_region
            .lock()
            .unwrap()
            .get(region)
            .cloned()
            .unwrap_or_default())
    }
}

/// Cluster API holding namespaces and secrets per cluster.
#[derive(Default)]
pub struct FakeClusterApi {
    namespaces: Mutex<HashSet<(String, String)>>,
    secrets: Mutex<Vec<(String, Secret)>>,
}

impl FakeClusterApi {
    pub fn has_namespace(&self, cluster: &str, namespace: &str) -> bool {
        self.namespaces
            .lock()
            .unwrap()
            .contains(&(cluster.to_string(), namespace.to_string()))
    }

    /// Applied secrets as `(cluster, secret)`.
    pub fn secrets(&self) -> Vec<(String, Secret)> {
        self.secrets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterApi for FakeClusterApi {
    async fn ensure_namespace(
        &self,
        cluster: &ClusterHandle,
        namespace: &str,
    ) -> Result<EnsureOutcome, ClusterApiError> {
        let inserted = self
            .namespaces
            .lock()
            .unwrap()
            .insert((cluster.name.clone(), namespace.to_string()));
        Ok(if inserted {
            EnsureOutcome::Created
        } else {
            EnsureOutcome::Existing
        })
    }

    async fn apply_secret(
        &self,
        cluster: &ClusterHandle,
        secret: &Secret,
    ) -> Result<(), ClusterApiError> {
        self.secrets
            .lock()
            .unwrap()
            .push((cluster.name.clone(), secret.clone()));
        Ok(())
    }
}

/// Resolver backed by a fixed host table.
#[derive(Default)]
pub struct FakeResolver {
    hosts: Mutex<HashMap<String, Vec<IpAddr>>>,
}

impl FakeResolver {
    pub fn add(&self, host: &str, addresses: &[&str]) {
        let parsed = addresses.iter().map(|a| a.parse().unwrap()).collect();
        self.hosts.lock().unwrap().insert(host.to_string(), parsed);
    }
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        self.hosts
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .ok_or_else(|| DnsError::ResolutionFailed {
                host: host.to_string(),
                reason: "no such host".to_string(),
            })
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Concrete handles on every fake, alongside the [`Providers`] built from them.
#[derive(Default)]
pub struct Fakes {
    pub clusters: Arc<FakeClusters>,
    pub installer: Arc<FakeInstaller>,
    pub identity: Arc<FakeIdentity>,
    pub dns: Arc<FakeDns>,
    pub certificates: Arc<FakeCertificates>,
    pub cluster_api: Arc<FakeClusterApi>,
    pub resolver: Arc<FakeResolver>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn providers(&self) -> Providers {
        Providers {
            clusters: self.clusters.clone(),
            installer: self.installer.clone(),
            identity: self.identity.clone(),
            dns: self.dns.clone(),
            certificates: self.certificates.clone(),
            cluster_api: self.cluster_api.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

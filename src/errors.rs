// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for every external boundary the orchestrator drives.
//!
//! Each boundary (cluster provisioner, package installer, identity provider,
//! DNS/health-check service, certificate catalog, in-cluster API) has its own
//! error enum so operators and tests can tell causes apart without parsing
//! text. [`FleetError`] is the composite returned by the pipeline and exposes a
//! stable reason code through [`FleetError::reason`].
//!
//! Nothing here is retried: every variant is fatal for the run that hit it.

use thiserror::Error;

/// Errors raised while ensuring a regional compute cluster exists.
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    /// The provisioner could not report whether the cluster exists
    #[error("Failed to describe cluster '{cluster}' in {region}: {reason}")]
    DescribeFailed {
        /// Cluster name
        cluster: String,
        /// Region code
        region: String,
        /// Provisioner output
        reason: String,
    },

    /// Cluster creation failed
    #[error("Failed to create cluster '{cluster}' in {region}: {reason}")]
    CreationFailed {
        /// Cluster name
        cluster: String,
        /// Region code
        region: String,
        /// Provisioner output
        reason: String,
    },

    /// A cluster with the derived name exists but is not usable yet
    ///
    /// Returned instead of attempting a second create against a cluster that is
    /// still creating, updating or being deleted.
    #[error("Cluster '{cluster}' in {region} exists with status {status}, expected ACTIVE")]
    NotReady {
        /// Cluster name
        cluster: String,
        /// Region code
        region: String,
        /// Status reported by the provisioner
        status: String,
    },

    /// Workload-identity federation (OIDC provider association) failed
    #[error("Failed to associate identity provider for cluster '{cluster}' in {region}: {reason}")]
    IdentityFederationFailed {
        /// Cluster name
        cluster: String,
        /// Region code
        region: String,
        /// Provisioner output
        reason: String,
    },

    /// Local access credentials could not be refreshed
    #[error("Failed to refresh kubeconfig for cluster '{cluster}' in {region}: {reason}")]
    KubeconfigRefreshFailed {
        /// Cluster name
        cluster: String,
        /// Region code
        region: String,
        /// Provisioner output
        reason: String,
    },
}

/// Errors raised by the package installer.
#[derive(Error, Debug, Clone)]
pub enum InstallerError {
    /// A chart repository could not be registered
    #[error("Failed to add chart repository '{name}' ({url}): {reason}")]
    RepositoryFailed {
        /// Repository alias
        name: String,
        /// Repository URL
        url: String,
        /// Installer output
        reason: String,
    },

    /// Release state could not be read
    #[error("Failed to read release '{release}' in {namespace} on cluster '{cluster}': {reason}")]
    StatusFailed {
        /// Release name
        release: String,
        /// Namespace
        namespace: String,
        /// Cluster name
        cluster: String,
        /// Installer output
        reason: String,
    },

    /// Install or upgrade failed for a reason other than the readiness wait
    #[error("Failed to install or upgrade release '{release}' in {namespace} on cluster '{cluster}': {reason}")]
    ReleaseFailed {
        /// Release name
        release: String,
        /// Namespace
        namespace: String,
        /// Cluster name
        cluster: String,
        /// Installer output
        reason: String,
    },

    /// The release did not become ready before the wait expired
    #[error("Release '{release}' in {namespace} on cluster '{cluster}' not ready after {timeout_secs}s")]
    ReadinessTimeout {
        /// Release name
        release: String,
        /// Namespace
        namespace: String,
        /// Cluster name
        cluster: String,
        /// Wait that elapsed
        timeout_secs: u64,
    },

    /// A raw manifest could not be applied
    #[error("Failed to apply manifest {url} on cluster '{cluster}': {reason}")]
    ManifestApplyFailed {
        /// Manifest location
        url: String,
        /// Cluster name
        cluster: String,
        /// Installer output
        reason: String,
    },

    /// The values payload could not be staged on disk
    #[error("Failed to stage values for release '{release}': {reason}")]
    ValuesStagingFailed {
        /// Release name
        release: String,
        /// I/O or serialization error
        reason: String,
    },
}

/// Errors raised by the identity provider.
#[derive(Error, Debug, Clone)]
pub enum IdentityError {
    /// Policies could not be listed
    #[error("Failed to look up policy '{name}': {reason}")]
    PolicyLookupFailed {
        /// Policy name
        name: String,
        /// Provider output
        reason: String,
    },

    /// Policy creation failed
    #[error("Failed to create policy '{name}': {reason}")]
    PolicyCreationFailed {
        /// Policy name
        name: String,
        /// Provider output
        reason: String,
    },

    /// Conditional create lost: a policy with this name already exists
    #[error("Policy '{name}' already exists")]
    PolicyConflict {
        /// Policy name
        name: String,
    },

    /// The stored document of an existing policy could not be read
    #[error("Failed to read document of policy {arn}: {reason}")]
    PolicyDocumentUnavailable {
        /// Policy ARN
        arn: String,
        /// Provider output
        reason: String,
    },

    /// Service identity binding failed
    #[error("Failed to bind service account {namespace}/{service_account} on cluster '{cluster}': {reason}")]
    BindingFailed {
        /// Cluster name
        cluster: String,
        /// Namespace of the service account
        namespace: String,
        /// Service account name
        service_account: String,
        /// Provider output
        reason: String,
    },
}

/// Errors raised by the DNS and health-check service.
#[derive(Error, Debug, Clone)]
pub enum DnsError {
    /// Health check creation failed
    #[error("Failed to create health check for {endpoint}: {reason}")]
    HealthCheckCreationFailed {
        /// Probed endpoint
        endpoint: String,
        /// Provider output
        reason: String,
    },

    /// The caller reference was reused with a different configuration
    #[error("Health check caller reference '{caller_reference}' already used with a different configuration")]
    HealthCheckConflict {
        /// Idempotency token
        caller_reference: String,
    },

    /// Record set change failed
    #[error("Failed to change record sets for '{name}' in zone {zone}: {reason}")]
    RecordChangeFailed {
        /// Hosted zone identifier
        zone: String,
        /// Record name
        name: String,
        /// Provider output
        reason: String,
    },

    /// Endpoint hostname could not be resolved
    #[error("Failed to resolve {host}: {reason}")]
    ResolutionFailed {
        /// Hostname
        host: String,
        /// Resolver error
        reason: String,
    },

    /// Endpoint hostname resolved to no IPv4 address
    #[error("Host {host} resolved to no IPv4 address")]
    NoAddress {
        /// Hostname
        host: String,
    },
}

/// Errors raised while selecting the TLS certificate for a regional endpoint.
#[derive(Error, Debug, Clone)]
pub enum CertificateError {
    /// Certificates could not be listed
    #[error("Failed to list certificates in {region}: {reason}")]
    LookupFailed {
        /// Region code
        region: String,
        /// Provider output
        reason: String,
    },

    /// No issued certificate covers the hostname
    #[error("No certificate in {region} covers {hostname}")]
    NotFound {
        /// Regional hostname
        hostname: String,
        /// Region code
        region: String,
    },

    /// More than one issued certificate covers the hostname
    #[error("{} certificates in {region} cover {hostname}: {}", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        /// Regional hostname
        hostname: String,
        /// Region code
        region: String,
        /// ARNs of every matching certificate
        candidates: Vec<String>,
    },
}

/// Errors raised by direct calls to a cluster's control plane.
#[derive(Error, Debug, Clone)]
pub enum ClusterApiError {
    /// No client could be built for the cluster's kubeconfig context
    #[error("Failed to connect to cluster '{cluster}' (context {context}): {reason}")]
    ConnectionFailed {
        /// Cluster name
        cluster: String,
        /// Kubeconfig context
        context: String,
        /// Client error
        reason: String,
    },

    /// Namespace could not be ensured
    #[error("Failed to ensure namespace '{namespace}' on cluster '{cluster}': {reason}")]
    NamespaceFailed {
        /// Cluster name
        cluster: String,
        /// Namespace
        namespace: String,
        /// API error
        reason: String,
    },

    /// Secret could not be applied
    #[error("Failed to apply secret {namespace}/{name} on cluster '{cluster}': {reason}")]
    SecretFailed {
        /// Cluster name
        cluster: String,
        /// Namespace
        namespace: String,
        /// Secret name
        name: String,
        /// API error
        reason: String,
    },
}

/// Errors in operator-supplied configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Region list is empty
    #[error("At least one region is required")]
    NoRegions,

    /// A region code is blank
    #[error("Region codes must not be empty")]
    EmptyRegion,

    /// A region appears twice
    #[error("Region '{0}' is listed more than once")]
    DuplicateRegion(String),

    /// A required value is empty
    #[error("Configuration value '{0}' must not be empty")]
    MissingValue(&'static str),

    /// Node pool bounds are inconsistent
    #[error("Invalid node pool: min {min}, desired {desired}, max {max}")]
    InvalidNodePool {
        /// Minimum node count
        min: u32,
        /// Desired node count
        desired: u32,
        /// Maximum node count
        max: u32,
    },

    /// TLS bundle directory is unreadable or incomplete
    #[error("Invalid TLS bundle at {path}: {reason}")]
    InvalidTlsBundle {
        /// Bundle directory
        path: String,
        /// I/O error
        reason: String,
    },
}

/// Errors writing persisted artifacts (TLS secret manifest, failover snapshot).
#[derive(Error, Debug, Clone)]
pub enum ArtifactError {
    /// Artifact could not be serialized
    #[error("Failed to serialize {what}: {reason}")]
    SerializeFailed {
        /// Artifact description
        what: String,
        /// Serializer error
        reason: String,
    },

    /// Artifact could not be written
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// Destination path
        path: String,
        /// I/O error
        reason: String,
    },
}

/// Composite error returned by the orchestration pipeline.
#[derive(Error, Debug, Clone)]
pub enum FleetError {
    /// Cluster provisioning error
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Package installer error
    #[error(transparent)]
    Installer(#[from] InstallerError),

    /// Identity provider error
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// DNS or health-check error
    #[error(transparent)]
    Dns(#[from] DnsError),

    /// Certificate selection error
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// In-cluster API error
    #[error(transparent)]
    ClusterApi(#[from] ClusterApiError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Artifact persistence error
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A region's pipeline aborted; wraps the step error
    #[error("Region {region} failed: {source}")]
    Region {
        /// Region code
        region: String,
        /// Step error
        source: Box<FleetError>,
    },
}

impl FleetError {
    /// Wrap this error with the region whose pipeline it aborted.
    #[must_use]
    pub fn in_region(self, region: &str) -> Self {
        Self::Region {
            region: region.to_string(),
            source: Box::new(self),
        }
    }

    /// Returns true when the error is a readiness-wait timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Installer(InstallerError::ReadinessTimeout { .. }) => true,
            Self::Region { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns a stable reason code for this error.
    ///
    /// Region wrappers report the reason of the step that failed.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Cluster(ClusterError::DescribeFailed { .. }) => "ClusterDescribeFailed",
            Self::Cluster(ClusterError::CreationFailed { .. }) => "ClusterCreationFailed",
            Self::Cluster(ClusterError::NotReady { .. }) => "ClusterNotReady",
            Self::Cluster(ClusterError::IdentityFederationFailed { .. }) => {
                "IdentityFederationFailed"
            }
            Self::Cluster(ClusterError::KubeconfigRefreshFailed { .. }) => {
                "KubeconfigRefreshFailed"
            }

            Self::Installer(InstallerError::RepositoryFailed { .. }) => "ChartRepositoryFailed",
            Self::Installer(InstallerError::StatusFailed { .. }) => "ReleaseStatusFailed",
            Self::Installer(InstallerError::ReleaseFailed { .. }) => "ReleaseFailed",
            Self::Installer(InstallerError::ReadinessTimeout { .. }) => "ReleaseReadinessTimeout",
            Self::Installer(InstallerError::ManifestApplyFailed { .. }) => "ManifestApplyFailed",
            Self::Installer(InstallerError::ValuesStagingFailed { .. }) => "ValuesStagingFailed",

            Self::Identity(IdentityError::PolicyLookupFailed { .. }) => "PolicyLookupFailed",
            Self::Identity(IdentityError::PolicyCreationFailed { .. }) => "PolicyCreationFailed",
            Self::Identity(IdentityError::PolicyConflict { .. }) => "PolicyConflict",
            Self::Identity(IdentityError::PolicyDocumentUnavailable { .. }) => {
                "PolicyDocumentUnavailable"
            }
            Self::Identity(IdentityError::BindingFailed { .. }) => "IdentityBindingFailed",

            Self::Dns(DnsError::HealthCheckCreationFailed { .. }) => "HealthCheckCreationFailed",
            Self::Dns(DnsError::HealthCheckConflict { .. }) => "HealthCheckConflict",
            Self::Dns(DnsError::RecordChangeFailed { .. }) => "RecordChangeFailed",
            Self::Dns(DnsError::ResolutionFailed { .. }) => "EndpointResolutionFailed",
            Self::Dns(DnsError::NoAddress { .. }) => "EndpointHasNoAddress",

            Self::Certificate(CertificateError::LookupFailed { .. }) => "CertificateLookupFailed",
            Self::Certificate(CertificateError::NotFound { .. }) => "CertificateNotFound",
            Self::Certificate(CertificateError::Ambiguous { .. }) => "CertificateAmbiguous",

            Self::ClusterApi(ClusterApiError::ConnectionFailed { .. }) => {
                "ClusterConnectionFailed"
            }
            Self::ClusterApi(ClusterApiError::NamespaceFailed { .. }) => "NamespaceFailed",
            Self::ClusterApi(ClusterApiError::SecretFailed { .. }) => "SecretApplyFailed",

            Self::Config(_) => "InvalidConfiguration",

            Self::Artifact(ArtifactError::SerializeFailed { .. }) => "ArtifactSerializeFailed",
            Self::Artifact(ArtifactError::WriteFailed { .. }) => "ArtifactWriteFailed",

            Self::Region { source, .. } => source.reason(),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment of the webhook release into one regional cluster.
//!
//! The values payload is staged in a scratch file that lives exactly as long
//! as the install call: it is removed when the deploy returns, whether the
//! install succeeded, failed, or timed out waiting for readiness.

use serde::Serialize;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::tls::{write_secret_manifest, TlsBundle};
use super::values::{RegionalInputs, WebhookValues};
use crate::config::{ImageRef, OrchestratorConfig, Region};
use crate::errors::{CertificateError, FleetError, InstallerError};
use crate::providers::{
    CertificateCatalog, CertificateSummary, ClusterApi, ClusterHandle, EnsureOutcome,
    PackageInstaller, ReleaseOutcome, ReleaseRequest,
};

/// What a deploy did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    /// Whether the target namespace had to be created
    pub namespace: EnsureOutcome,
    /// Certificate bound to the regional ingress
    pub certificate_arn: String,
    /// Release outcome
    pub release: ReleaseOutcome,
    /// TLS secret manifest written for this cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_manifest: Option<PathBuf>,
}

/// Deploys the webhook release with region-specific material.
pub struct WebhookDeployer {
    installer: Arc<dyn PackageInstaller>,
    certificates: Arc<dyn CertificateCatalog>,
    cluster_api: Arc<dyn ClusterApi>,
}

impl WebhookDeployer {
    #[must_use]
    pub fn new(
        installer: Arc<dyn PackageInstaller>,
        certificates: Arc<dyn CertificateCatalog>,
        cluster_api: Arc<dyn ClusterApi>,
    ) -> Self {
        Self {
            installer,
            certificates,
            cluster_api,
        }
    }

    /// Install or upgrade the webhook release on `cluster` and wait for it to
    /// become ready.
    ///
    /// # Errors
    ///
    /// Returns the [`FleetError`] of the first failing step. A readiness
    /// timeout surfaces as `InstallerError::ReadinessTimeout` and is not retried.
    pub async fn deploy(
        &self,
        config: &OrchestratorConfig,
        region: &Region,
        cluster: &ClusterHandle,
        image: &ImageRef,
    ) -> Result<DeploymentReport, FleetError> {
        let namespace = self
            .cluster_api
            .ensure_namespace(cluster, &config.namespace)
            .await?;

        let listed = self.certificates.list_certificates(&region.code).await?;
        let certificate = select_certificate(&region.hostname, &region.code, &listed)?;
        info!(
            region = %region.code,
            hostname = %region.hostname,
            certificate = %certificate.arn,
            "Selected certificate"
        );

        let secret_name = format!("{}-certs", config.release_name);
        let mut ca_bundle = None;
        let mut tls_manifest = None;
        if let Some(dir) = &config.tls_bundle_dir {
            let bundle = TlsBundle::load(dir).await?;
            let secret = bundle.secret(&secret_name, &config.namespace, &region.code);
            tls_manifest =
                Some(write_secret_manifest(&config.artifacts_dir, &cluster.name, &secret).await?);
            self.cluster_api.apply_secret(cluster, &secret).await?;
            ca_bundle = Some(bundle.ca_bundle());
        }

        let values = WebhookValues::render(
            image,
            &config.webhook,
            RegionalInputs {
                region: &region.code,
                hostname: &region.hostname,
                certificate_arn: &certificate.arn,
                ca_bundle: ca_bundle.as_deref(),
                tls_secret_name: ca_bundle.as_ref().map(|_| secret_name.as_str()),
            },
        );

        let scratch = stage_values(&config.release_name, &values)?;
        let mut request =
            ReleaseRequest::new(&config.release_name, &config.chart, &config.namespace);
        request.values_file = Some(scratch.path().to_path_buf());
        request.wait = Some(config.readiness_timeout);

        let result = self.installer.install_or_upgrade(cluster, &request).await;
        // Drop is the cleanup; it runs on every path out of this function.
        drop(scratch);
        let release = result?;

        info!(
            region = %region.code,
            cluster = %cluster.name,
            release = %config.release_name,
            image = %image,
            outcome = ?release,
            "Webhook deployed"
        );
        Ok(DeploymentReport {
            namespace,
            certificate_arn: certificate.arn,
            release,
            tls_manifest,
        })
    }
}

/// Write the values payload to a scratch file removed on drop.
fn stage_values(release: &str, values: &WebhookValues) -> Result<NamedTempFile, InstallerError> {
    let staging_failed = |reason: String| InstallerError::ValuesStagingFailed {
        release: release.to_string(),
        reason,
    };
    let rendered = values.to_yaml().map_err(|e| staging_failed(e.to_string()))?;

    let mut scratch = tempfile::Builder::new()
        .prefix(&format!("{release}-values-"))
        .suffix(".yaml")
        .tempfile()
        .map_err(|e| staging_failed(e.to_string()))?;
    scratch
        .write_all(rendered.as_bytes())
        .map_err(|e| staging_failed(e.to_string()))?;
    scratch
        .flush()
        .map_err(|e| staging_failed(e.to_string()))?;

    debug!(release = %release, path = %scratch.path().display(), "Staged release values");
    Ok(scratch)
}

/// Pick the one certificate covering `hostname`.
///
/// Exact matches on the domain name or a SAN win; otherwise a single-label
/// wildcard (`*.example.com`) is accepted. Anything other than exactly one
/// candidate at the winning tier is an error.
///
/// # Errors
///
/// Returns [`CertificateError::NotFound`] or [`CertificateError::Ambiguous`].
pub fn select_certificate(
    hostname: &str,
    region: &str,
    certificates: &[CertificateSummary],
) -> Result<CertificateSummary, CertificateError> {
    let exact: Vec<&CertificateSummary> = certificates
        .iter()
        .filter(|c| names(c).any(|n| n.eq_ignore_ascii_case(hostname)))
        .collect();
    let candidates: Vec<&CertificateSummary> = if exact.is_empty() {
        certificates
            .iter()
            .filter(|c| names(c).any(|n| wildcard_matches(n, hostname)))
            .collect()
    } else {
        exact
    };

    match candidates.as_slice() {
        [] => Err(CertificateError::NotFound {
            hostname: hostname.to_string(),
            region: region.to_string(),
        }),
        [only] => Ok((*only).clone()),
        many => Err(CertificateError::Ambiguous {
            hostname: hostname.to_string(),
            region: region.to_string(),
            candidates: many.iter().map(|c| c.arn.clone()).collect(),
        }),
    }
}

fn names(certificate: &CertificateSummary) -> impl Iterator<Item = &str> {
    std::iter::once(certificate.domain_name.as_str())
        .chain(certificate.subject_alternative_names.iter().map(String::as_str))
}

/// `*.example.com` covers `a.example.com` but not `example.com` or `a.b.example.com`.
fn wildcard_matches(pattern: &str, hostname: &str) -> bool {
    let Some(suffix) = pattern.strip_prefix("*.") else {
        return false;
    };
    match hostname.split_once('.') {
        Some((label, rest)) => !label.is_empty() && rest.eq_ignore_ascii_case(suffix),
        None => false,
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod webhook_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared platform add-ons installed into every regional cluster.
//!
//! Order matters and is fixed:
//!
//! 1. Certificate issuer (with its CRDs and namespace)
//! 2. Metrics collector
//! 3. Load-balancer controller, after its policy and service identity
//! 4. DNS-record syncer, after its policy and service identity
//!
//! Every step is an upsert, so re-running against a converged cluster only
//! bumps release revisions.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::credentials::CredentialProvisioner;
use super::policies::{external_dns_policy, load_balancer_controller_policy};
use crate::config::{OrchestratorConfig, Region};
use crate::constants::{
    ADDON_READINESS_TIMEOUT_SECS, CERT_MANAGER_CHART, CERT_MANAGER_NAMESPACE,
    CERT_MANAGER_RELEASE, EKS_REPO_NAME, EKS_REPO_URL, EXTERNAL_DNS_CHART,
    EXTERNAL_DNS_POLICY_NAME, EXTERNAL_DNS_RELEASE, EXTERNAL_DNS_REPO_NAME, EXTERNAL_DNS_REPO_URL,
    EXTERNAL_DNS_SERVICE_ACCOUNT, JETSTACK_REPO_NAME, JETSTACK_REPO_URL, KUBE_SYSTEM_NAMESPACE,
    LB_CONTROLLER_CHART, LB_CONTROLLER_POLICY_NAME, LB_CONTROLLER_RELEASE,
    LB_CONTROLLER_SERVICE_ACCOUNT, METRICS_SERVER_MANIFEST_URL,
};
use crate::errors::{ArtifactError, FleetError};
use crate::providers::{ClusterHandle, PackageInstaller, PolicyRef, ReleaseOutcome, ReleaseRequest};

/// Name under which the metrics collector is reported.
const METRICS_SERVER_ADDON: &str = "metrics-server";

/// How an add-on step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AddonOutcome {
    /// Chart release installed or upgraded
    Release {
        /// Installer outcome
        outcome: ReleaseOutcome,
    },
    /// Raw manifest applied
    ManifestApplied,
}

/// Result of one add-on step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonReport {
    /// Add-on name
    pub name: String,
    /// Step outcome
    pub outcome: AddonOutcome,
    /// Policy backing the add-on's service identity, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyRef>,
}

/// Installs the platform add-ons in dependency order.
pub struct ComponentInstaller {
    installer: Arc<dyn PackageInstaller>,
    credentials: Arc<CredentialProvisioner>,
}

impl ComponentInstaller {
    #[must_use]
    pub fn new(
        installer: Arc<dyn PackageInstaller>,
        credentials: Arc<CredentialProvisioner>,
    ) -> Self {
        Self {
            installer,
            credentials,
        }
    }

    /// Install or upgrade every add-on on `cluster`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`FleetError`] of the failing step; later steps are not attempted.
    pub async fn install_platform_components(
        &self,
        config: &OrchestratorConfig,
        region: &Region,
        cluster: &ClusterHandle,
    ) -> Result<Vec<AddonReport>, FleetError> {
        let wait = Some(Duration::from_secs(ADDON_READINESS_TIMEOUT_SECS));
        let mut reports = Vec::with_capacity(4);

        // 1. Certificate issuer
        self.installer
            .add_repository(JETSTACK_REPO_NAME, JETSTACK_REPO_URL)
            .await?;
        let mut request =
            ReleaseRequest::new(CERT_MANAGER_RELEASE, CERT_MANAGER_CHART, CERT_MANAGER_NAMESPACE)
                .set("installCRDs", "true");
        request.create_namespace = true;
        request.wait = wait;
        reports.push(self.release(cluster, &request, None).await?);

        // 2. Metrics collector
        self.installer
            .apply_manifest_url(cluster, METRICS_SERVER_MANIFEST_URL)
            .await?;
        info!(cluster = %cluster.name, addon = METRICS_SERVER_ADDON, "Add-on ready");
        reports.push(AddonReport {
            name: METRICS_SERVER_ADDON.to_string(),
            outcome: AddonOutcome::ManifestApplied,
            policy: None,
        });

        // 3. Load-balancer controller
        let document =
            load_balancer_controller_policy().map_err(|e| ArtifactError::SerializeFailed {
                what: format!("{LB_CONTROLLER_POLICY_NAME} document"),
                reason: e.to_string(),
            })?;
        let policy = self
            .credentials
            .ensure_policy(LB_CONTROLLER_POLICY_NAME, &document)
            .await?;
        self.credentials
            .bind_identity(cluster, KUBE_SYSTEM_NAMESPACE, LB_CONTROLLER_SERVICE_ACCOUNT, &policy)
            .await?;
        self.installer
            .add_repository(EKS_REPO_NAME, EKS_REPO_URL)
            .await?;
        let mut request =
            ReleaseRequest::new(LB_CONTROLLER_RELEASE, LB_CONTROLLER_CHART, KUBE_SYSTEM_NAMESPACE)
                .set("clusterName", &cluster.name)
                .set("region", &region.code)
                .set("serviceAccount.create", "false")
                .set("serviceAccount.name", LB_CONTROLLER_SERVICE_ACCOUNT);
        request.wait = wait;
        reports.push(self.release(cluster, &request, Some(policy)).await?);

        // 4. DNS-record syncer
        let policy = self
            .credentials
            .ensure_policy(EXTERNAL_DNS_POLICY_NAME, &external_dns_policy())
            .await?;
        self.credentials
            .bind_identity(cluster, KUBE_SYSTEM_NAMESPACE, EXTERNAL_DNS_SERVICE_ACCOUNT, &policy)
            .await?;
        self.installer
            .add_repository(EXTERNAL_DNS_REPO_NAME, EXTERNAL_DNS_REPO_URL)
            .await?;
        let mut request =
            ReleaseRequest::new(EXTERNAL_DNS_RELEASE, EXTERNAL_DNS_CHART, KUBE_SYSTEM_NAMESPACE)
                .set("provider.name", "aws")
                .set("serviceAccount.create", "false")
                .set("serviceAccount.name", EXTERNAL_DNS_SERVICE_ACCOUNT)
                .set("domainFilters[0]", &config.domain)
                .set("policy", "upsert-only")
                .set("txtOwnerId", &cluster.name);
        request.wait = wait;
        reports.push(self.release(cluster, &request, Some(policy)).await?);

        Ok(reports)
    }

    async fn release(
        &self,
        cluster: &ClusterHandle,
        request: &ReleaseRequest,
        policy: Option<PolicyRef>,
    ) -> Result<AddonReport, FleetError> {
        let outcome = self.installer.install_or_upgrade(cluster, request).await?;
        info!(
            cluster = %cluster.name,
            addon = %request.release,
            outcome = ?outcome,
            "Add-on ready"
        );
        Ok(AddonReport {
            name: request.release.clone(),
            outcome: AddonOutcome::Release { outcome },
            policy,
        })
    }
}

#[cfg(test)]
#[path = "components_tests.rs"]
mod components_tests;

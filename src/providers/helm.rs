// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Release management through `helm`, raw manifests through `kubectl`.
//!
//! Every install goes through `helm upgrade --install`, so a release that is
//! already present is upgraded in place rather than duplicated. The outcome
//! reported back (installed vs upgraded) comes from the revision observed
//! right before the call.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ClusterHandle, PackageInstaller, ReleaseOutcome, ReleaseRequest};
use crate::command::{args, parse_json, CommandRunner};
use crate::errors::InstallerError;

const HELM: &str = "helm";
const KUBECTL: &str = "kubectl";

/// Markers `helm` prints when `--wait` gives up.
const TIMEOUT_MARKERS: [&str; 2] = [
    "timed out waiting for the condition",
    "context deadline exceeded",
];

#[derive(Debug, Deserialize)]
struct ListedRelease {
    name: String,
    revision: String,
}

/// [`PackageInstaller`] backed by the `helm` and `kubectl` CLIs.
#[derive(Clone)]
pub struct HelmInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl HelmInstaller {
    /// Create an installer using `runner` for every CLI call.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// Build the `helm upgrade --install` argument vector.
pub(crate) fn upgrade_install_args(context: &str, request: &ReleaseRequest) -> Vec<String> {
    let mut argv = args(["upgrade", "--install"]);
    argv.push(request.release.clone());
    argv.push(request.chart.clone());
    argv.push("--namespace".to_string());
    argv.push(request.namespace.clone());
    if request.create_namespace {
        argv.push("--create-namespace".to_string());
    }
    if let Some(values) = &request.values_file {
        argv.push("-f".to_string());
        argv.push(values.display().to_string());
    }
    for (key, value) in &request.set_values {
        argv.push("--set".to_string());
        argv.push(format!("{key}={value}"));
    }
    if let Some(wait) = request.wait {
        argv.push("--wait".to_string());
        argv.push("--timeout".to_string());
        argv.push(format!("{}s", wait.as_secs()));
    }
    argv.push("--kube-context".to_string());
    argv.push(context.to_string());
    argv
}

#[async_trait]
impl PackageInstaller for HelmInstaller {
    async fn add_repository(&self, name: &str, url: &str) -> Result<(), InstallerError> {
        debug!(repository = %name, url = %url, "Adding chart repository");
        self.runner
            .run(HELM, &args(["repo", "add", name, url, "--force-update"]))
            .await
            .map_err(|e| InstallerError::RepositoryFailed {
                name: name.to_string(),
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn release_revision(
        &self,
        cluster: &ClusterHandle,
        release: &str,
        namespace: &str,
    ) -> Result<Option<u32>, InstallerError> {
        let filter = format!("^{release}$");
        let argv = args([
            "list",
            "--namespace",
            namespace,
            "--filter",
            &filter,
            "--kube-context",
            &cluster.kube_context,
            "--output",
            "json",
        ]);
        let status_failed = |reason: String| InstallerError::StatusFailed {
            release: release.to_string(),
            namespace: namespace.to_string(),
            cluster: cluster.name.clone(),
            reason,
        };

        let output = self
            .runner
            .run(HELM, &argv)
            .await
            .map_err(|e| status_failed(e.to_string()))?;
        let listed: Vec<ListedRelease> =
            parse_json(HELM, &output).map_err(|e| status_failed(e.to_string()))?;

        match listed.into_iter().find(|r| r.name == release) {
            Some(found) => found
                .revision
                .parse()
                .map(Some)
                .map_err(|_| status_failed(format!("invalid revision '{}'", found.revision))),
            None => Ok(None),
        }
    }

    async fn install_or_upgrade(
        &self,
        cluster: &ClusterHandle,
        request: &ReleaseRequest,
    ) -> Result<ReleaseOutcome, InstallerError> {
        let previous = self
            .release_revision(cluster, &request.release, &request.namespace)
            .await?;

        info!(
            release = %request.release,
            chart = %request.chart,
            namespace = %request.namespace,
            cluster = %cluster.name,
            upgrade = previous.is_some(),
            "Installing or upgrading release"
        );

        let argv = upgrade_install_args(&cluster.kube_context, request);
        if let Err(e) = self.runner.run(HELM, &argv).await {
            if let Some(wait) = request.wait {
                if TIMEOUT_MARKERS.iter().any(|m| e.mentions(m)) {
                    return Err(InstallerError::ReadinessTimeout {
                        release: request.release.clone(),
                        namespace: request.namespace.clone(),
                        cluster: cluster.name.clone(),
                        timeout_secs: wait.as_secs(),
                    });
                }
            }
            return Err(InstallerError::ReleaseFailed {
                release: request.release.clone(),
                namespace: request.namespace.clone(),
                cluster: cluster.name.clone(),
                reason: e.to_string(),
            });
        }

        Ok(match previous {
            Some(revision) => ReleaseOutcome::Upgraded {
                revision: revision + 1,
            },
            None => ReleaseOutcome::Installed { revision: 1 },
        })
    }

    async fn apply_manifest_url(
        &self,
        cluster: &ClusterHandle,
        url: &str,
    ) -> Result<(), InstallerError> {
        info!(url = %url, cluster = %cluster.name, "Applying manifest");
        self.runner
            .run(
                KUBECTL,
                &args(["apply", "-f", url, "--context", &cluster.kube_context]),
            )
            .await
            .map_err(|e| InstallerError::ManifestApplyFailed {
                url: url.to_string(),
                cluster: cluster.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "helm_tests.rs"]
mod helm_tests;

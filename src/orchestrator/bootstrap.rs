// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-region cluster existence and reachability.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::{OrchestratorConfig, Region};
use crate::constants::CLUSTER_STATUS_ACTIVE;
use crate::errors::ClusterError;
use crate::providers::{ClusterHandle, ClusterProvisioner, ClusterSpec};

/// Whether the region's cluster was created by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterOutcome {
    /// No cluster existed; one was created
    Created,
    /// An active cluster with the derived name was reused
    Reused,
}

/// Ensures one reachable cluster per region.
pub struct ClusterBootstrapper {
    clusters: Arc<dyn ClusterProvisioner>,
}

impl ClusterBootstrapper {
    #[must_use]
    pub fn new(clusters: Arc<dyn ClusterProvisioner>) -> Self {
        Self { clusters }
    }

    /// Make sure the region's cluster exists, is federated for workload
    /// identity, and is reachable through a fresh kubeconfig context.
    ///
    /// An existing cluster is only reused when it is `ACTIVE`; any other
    /// status fails rather than racing an in-flight create or delete.
    ///
    /// # Errors
    ///
    /// Returns a [`ClusterError`] from the provisioner, or
    /// [`ClusterError::NotReady`] for a cluster that exists but is not active.
    pub async fn ensure_cluster(
        &self,
        config: &OrchestratorConfig,
        region: &Region,
    ) -> Result<(ClusterHandle, ClusterOutcome), ClusterError> {
        let name = &region.cluster_name;

        let outcome = match self.clusters.describe_cluster(name, &region.code).await? {
            Some(existing) if existing.status == CLUSTER_STATUS_ACTIVE => {
                info!(cluster = %name, region = %region.code, "Reusing active cluster");
                ClusterOutcome::Reused
            }
            Some(existing) => {
                return Err(ClusterError::NotReady {
                    cluster: name.clone(),
                    region: region.code.clone(),
                    status: existing.status,
                });
            }
            None => {
                let spec = ClusterSpec {
                    name: name.clone(),
                    region: region.code.clone(),
                    node_pool: config.node_pool.clone(),
                    tags: config.cluster_tags(region),
                };
                self.clusters.create_cluster(&spec).await?;
                info!(cluster = %name, region = %region.code, "Cluster created");
                ClusterOutcome::Created
            }
        };

        self.clusters
            .associate_oidc_provider(name, &region.code)
            .await?;
        let kube_context = self.clusters.update_kubeconfig(name, &region.code).await?;

        Ok((
            ClusterHandle {
                name: name.clone(),
                region: region.code.clone(),
                kube_context,
            },
            outcome,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageRef;
    use crate::testing::FakeClusters;

    fn setup() -> (OrchestratorConfig, Region) {
        let config = OrchestratorConfig::new(
            vec!["r1".to_string()],
            "svc",
            "webhook-system",
            "example.com",
            ImageRef {
                registry: "ghcr.io/acme".to_string(),
                name: "webhook".to_string(),
                tag: "1.0.0".to_string(),
            },
        );
        let region = config.regions().unwrap().remove(0);
        (config, region)
    }

    #[tokio::test]
    async fn test_missing_cluster_is_created_and_federated() {
        let (config, region) = setup();
        let clusters = Arc::new(FakeClusters::default());
        let bootstrapper = ClusterBootstrapper::new(clusters.clone());

        let (handle, outcome) = bootstrapper.ensure_cluster(&config, &region).await.unwrap();

        assert_eq!(outcome, ClusterOutcome::Created);
        assert_eq!(handle.name, "svc-r1");
        assert_eq!(handle.kube_context, "svc-r1");
        assert_eq!(
            clusters.calls(),
            vec![
                "describe:svc-r1",
                "create:svc-r1",
                "associate:svc-r1",
                "kubeconfig:svc-r1"
            ]
        );
    }

    #[tokio::test]
    async fn test_active_cluster_is_reused_without_create() {
        let (config, region) = setup();
        let clusters = Arc::new(FakeClusters::default());
        clusters.with_cluster("svc-r1", "ACTIVE");
        let bootstrapper = ClusterBootstrapper::new(clusters.clone());

        let (_, outcome) = bootstrapper.ensure_cluster(&config, &region).await.unwrap();

        assert_eq!(outcome, ClusterOutcome::Reused);
        assert!(clusters.calls_of("create").is_empty());
        assert_eq!(clusters.calls_of("associate"), vec!["svc-r1"]);
    }

    #[tokio::test]
    async fn test_cluster_in_transition_is_not_ready() {
        let (config, region) = setup();
        let clusters = Arc::new(FakeClusters::default());
        clusters.with_cluster("svc-r1", "CREATING");
        let bootstrapper = ClusterBootstrapper::new(clusters.clone());

        let err = bootstrapper
            .ensure_cluster(&config, &region)
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::NotReady { ref status, .. } if status == "CREATING"));
        assert!(clusters.calls_of("kubeconfig").is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let (config, region) = setup();
        let clusters = Arc::new(FakeClusters::default());
        clusters.fail_creates();
        let bootstrapper = ClusterBootstrapper::new(clusters.clone());

        let err = bootstrapper
            .ensure_cluster(&config, &region)
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::CreationFailed { .. }));
        assert!(clusters.calls_of("associate").is_empty());
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! EKS cluster provisioning through `eksctl` and `aws eks`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ClusterDescription, ClusterProvisioner, ClusterSpec};
use crate::command::{args, parse_json, CommandRunner};
use crate::errors::ClusterError;

const EKSCTL: &str = "eksctl";
const AWS: &str = "aws";

/// Error code returned by EKS when a cluster does not exist
const NOT_FOUND_MARKER: &str = "ResourceNotFoundException";

#[derive(Debug, Deserialize)]
struct DescribeClusterOutput {
    cluster: DescribedCluster,
}

#[derive(Debug, Deserialize)]
struct DescribedCluster {
    name: String,
    status: String,
    endpoint: Option<String>,
}

/// [`ClusterProvisioner`] backed by the `eksctl` and `aws` CLIs.
#[derive(Clone)]
pub struct EksctlProvisioner {
    runner: Arc<dyn CommandRunner>,
}

impl EksctlProvisioner {
    /// Create a provisioner using `runner` for every CLI call.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// Render tags as `eksctl`'s `k1=v1,k2=v2` list.
pub(crate) fn render_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the `eksctl create cluster` argument vector.
pub(crate) fn create_cluster_args(spec: &ClusterSpec) -> Vec<String> {
    let mut argv = args(["create", "cluster"]);
    argv.extend([
        "--name".to_string(),
        spec.name.clone(),
        "--region".to_string(),
        spec.region.clone(),
        "--managed".to_string(),
        "--node-type".to_string(),
        spec.node_pool.instance_type.clone(),
        "--nodes".to_string(),
        spec.node_pool.desired_nodes.to_string(),
        "--nodes-min".to_string(),
        spec.node_pool.min_nodes.to_string(),
        "--nodes-max".to_string(),
        spec.node_pool.max_nodes.to_string(),
        "--with-oidc".to_string(),
    ]);
    if !spec.tags.is_empty() {
        argv.push("--tags".to_string());
        argv.push(render_tags(&spec.tags));
    }
    argv
}

#[async_trait]
impl ClusterProvisioner for EksctlProvisioner {
    async fn describe_cluster(
        &self,
        name: &str,
        region: &str,
    ) -> Result<Option<ClusterDescription>, ClusterError> {
        let argv = args([
            "eks",
            "describe-cluster",
            "--name",
            name,
            "--region",
            region,
            "--output",
            "json",
        ]);

        let output = match self.runner.run(AWS, &argv).await {
            Ok(output) => output,
            Err(e) if e.mentions(NOT_FOUND_MARKER) => {
                debug!(cluster = %name, region = %region, "Cluster does not exist");
                return Ok(None);
            }
            Err(e) => {
                return Err(ClusterError::DescribeFailed {
                    cluster: name.to_string(),
                    region: region.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let described: DescribeClusterOutput =
            parse_json(AWS, &output).map_err(|e| ClusterError::DescribeFailed {
                cluster: name.to_string(),
                region: region.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(ClusterDescription {
            name: described.cluster.name,
            status: described.cluster.status,
            endpoint: described.cluster.endpoint,
        }))
    }

    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<(), ClusterError> {
        info!(
            cluster = %spec.name,
            region = %spec.region,
            node_type = %spec.node_pool.instance_type,
            "Creating cluster"
        );
        self.runner
            .run(EKSCTL, &create_cluster_args(spec))
            .await
            .map_err(|e| ClusterError::CreationFailed {
                cluster: spec.name.clone(),
                region: spec.region.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn associate_oidc_provider(&self, name: &str, region: &str) -> Result<(), ClusterError> {
        let argv = args([
            "utils",
            "associate-iam-oidc-provider",
            "--cluster",
            name,
            "--region",
            region,
            "--approve",
        ]);
        self.runner
            .run(EKSCTL, &argv)
            .await
            .map_err(|e| ClusterError::IdentityFederationFailed {
                cluster: name.to_string(),
                region: region.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn update_kubeconfig(&self, name: &str, region: &str) -> Result<String, ClusterError> {
        // The alias makes the context name predictable instead of the cluster ARN.
        let argv = args([
            "eks",
            "update-kubeconfig",
            "--name",
            name,
            "--region",
            region,
            "--alias",
            name,
        ]);
        self.runner
            .run(AWS, &argv)
            .await
            .map_err(|e| ClusterError::KubeconfigRefreshFailed {
                cluster: name.to_string(),
                region: region.to_string(),
                reason: e.to_string(),
            })?;
        Ok(name.to_string())
    }
}

#[cfg(test)]
#[path = "eksctl_tests.rs"]
mod eksctl_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the admission fleet orchestrator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Orchestrator Identity
// ============================================================================

/// Field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "admission-fleet";

/// Tag key marking cloud resources owned by this tool
pub const OWNER_TAG_KEY: &str = "owner";

/// Tag value marking cloud resources owned by this tool
pub const OWNER_TAG_VALUE: &str = "admission-fleet";

/// Tag key recording the region a cluster serves
pub const REGION_TAG_KEY: &str = "fleet-region";

// ============================================================================
// Naming Defaults
// ============================================================================

/// Default hostname label for the public regional endpoint (`service-<region>.<domain>`)
pub const DEFAULT_SERVICE_NAME: &str = "service";

/// Default namespace for the webhook release
pub const DEFAULT_NAMESPACE: &str = "webhook-system";

/// Default release name for the webhook chart
pub const DEFAULT_RELEASE_NAME: &str = "admission-webhook";

/// Default chart reference for the webhook release
pub const DEFAULT_CHART_REF: &str = "./helm/admission-webhook";

/// Directory (relative to the working directory) receiving generated artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Maximum length of an IAM role name
pub const IAM_ROLE_NAME_MAX_LEN: usize = 64;

// ============================================================================
// Cluster Shape
// ============================================================================

/// Default EC2 instance type for the managed node group
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.medium";

/// Default minimum node count
pub const DEFAULT_MIN_NODES: u32 = 2;

/// Default maximum node count
pub const DEFAULT_MAX_NODES: u32 = 4;

/// Default desired node count
pub const DEFAULT_DESIRED_NODES: u32 = 2;

/// Cluster status reported by the provisioner once the control plane is usable
pub const CLUSTER_STATUS_ACTIVE: &str = "ACTIVE";

// ============================================================================
// Timeouts
// ============================================================================

/// Default readiness wait for the webhook release (10 minutes)
pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 600;

/// Readiness wait for platform add-on releases (5 minutes)
pub const ADDON_READINESS_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Platform Add-ons
// ============================================================================

/// Namespace for cert-manager
pub const CERT_MANAGER_NAMESPACE: &str = "cert-manager";

/// Release name for cert-manager
pub const CERT_MANAGER_RELEASE: &str = "cert-manager";

/// Chart reference for cert-manager
pub const CERT_MANAGER_CHART: &str = "jetstack/cert-manager";

/// Helm repository name hosting cert-manager
pub const JETSTACK_REPO_NAME: &str = "jetstack";

/// Helm repository URL hosting cert-manager
pub const JETSTACK_REPO_URL: &str = "https://charts.jetstack.io";

/// Upstream manifest for metrics-server
pub const METRICS_SERVER_MANIFEST_URL: &str =
    "https://github.com/kubernetes-sigs/metrics-server/releases/latest/download/components.yaml";

/// Namespace hosting the load-balancer controller and external-dns
pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";

/// Helm repository name hosting the AWS load-balancer controller
pub const EKS_REPO_NAME: &str = "eks";

/// Helm repository URL hosting the AWS load-balancer controller
pub const EKS_REPO_URL: &str = "https://aws.github.io/eks-charts";

/// Release name for the AWS load-balancer controller
pub const LB_CONTROLLER_RELEASE: &str = "aws-load-balancer-controller";

/// Chart reference for the AWS load-balancer controller
pub const LB_CONTROLLER_CHART: &str = "eks/aws-load-balancer-controller";

/// IAM policy name shared by every load-balancer controller
pub const LB_CONTROLLER_POLICY_NAME: &str = "AWSLoadBalancerControllerIAMPolicy";

/// Service account bound to the load-balancer controller policy
pub const LB_CONTROLLER_SERVICE_ACCOUNT: &str = "aws-load-balancer-controller";

/// Helm repository name hosting external-dns
pub const EXTERNAL_DNS_REPO_NAME: &str = "external-dns";

/// Helm repository URL hosting external-dns
pub const EXTERNAL_DNS_REPO_URL: &str = "https://kubernetes-sigs.github.io/external-dns/";

/// Release name for external-dns
pub const EXTERNAL_DNS_RELEASE: &str = "external-dns";

/// Chart reference for external-dns
pub const EXTERNAL_DNS_CHART: &str = "external-dns/external-dns";

/// IAM policy name shared by every external-dns deployment
pub const EXTERNAL_DNS_POLICY_NAME: &str = "external-dns-policy";

/// Service account bound to the external-dns policy
pub const EXTERNAL_DNS_SERVICE_ACCOUNT: &str = "external-dns";

// ============================================================================
// Failover Constants
// ============================================================================

/// Port probed by failover health checks
pub const HEALTH_CHECK_PORT: u16 = 443;

/// Seconds between health-check probes
pub const HEALTH_CHECK_INTERVAL_SECS: u32 = 30;

/// Consecutive failed probes before an endpoint is marked unhealthy
pub const HEALTH_CHECK_FAILURE_THRESHOLD: u32 = 3;

/// Default health-check request path
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/health";

/// Default TTL for failover records (1 minute)
pub const DEFAULT_FAILOVER_TTL_SECS: u32 = 60;

/// Maximum length of a health-check caller reference
pub const CALLER_REFERENCE_MAX_LEN: usize = 64;

/// Default file name of the failover snapshot
pub const DEFAULT_FAILOVER_CONFIG_FILE: &str = "failover-config.json";

// ============================================================================
// Webhook Service Defaults
// ============================================================================

/// Default port for the webhook's metrics endpoint
pub const WEBHOOK_METRICS_PORT: u16 = 9090;

/// Default CPU request injected by the webhook
pub const DEFAULT_CPU_REQUEST: &str = "100m";

/// Default CPU limit injected by the webhook
pub const DEFAULT_CPU_LIMIT: &str = "1";

/// Default memory request injected by the webhook
pub const DEFAULT_MEMORY_REQUEST: &str = "128Mi";

/// Default memory limit injected by the webhook
pub const DEFAULT_MEMORY_LIMIT: &str = "512Mi";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation keys applied to objects the orchestrator creates
//! directly in a cluster, and annotation keys it writes into release values.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` and `app.kubernetes.io/part-of`
pub const MANAGED_BY_FLEET: &str = "admission-fleet";

/// Component value for the webhook's TLS secret
pub const COMPONENT_WEBHOOK_TLS: &str = "webhook-tls";

// ============================================================================
// Fleet-Specific Labels
// ============================================================================

/// Region code a namespaced object was provisioned for
pub const FLEET_REGION: &str = "fleet.admission.io/region";

// ============================================================================
// Ingress Annotations (rendered into release values)
// ============================================================================

/// Load balancer scheme
pub const ALB_SCHEME: &str = "alb.ingress.kubernetes.io/scheme";

/// Certificate terminating TLS at the load balancer
pub const ALB_CERTIFICATE_ARN: &str = "alb.ingress.kubernetes.io/certificate-arn";

/// Load balancer target type
pub const ALB_TARGET_TYPE: &str = "alb.ingress.kubernetes.io/target-type";

/// Hostname the DNS syncer publishes for the ingress
pub const EXTERNAL_DNS_HOSTNAME: &str = "external-dns.alpha.kubernetes.io/hostname";

/// Public load balancer scheme
pub const ALB_SCHEME_INTERNET_FACING: &str = "internet-facing";

/// Route traffic straight to pod IPs
pub const ALB_TARGET_TYPE_IP: &str = "ip";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # admission-fleet - Multi-Region Admission Webhook Orchestrator
//!
//! admission-fleet brings up a stateless request-validation webhook in several
//! independent cloud regions and wires the regional endpoints into one
//! failover-capable DNS name.
//!
//! ## Overview
//!
//! Each run drives several external control planes, each with its own
//! consistency model and its own notion of "already exists":
//!
//! - Managed Kubernetes clusters, one per region
//! - Helm releases for the platform add-ons and the webhook itself
//! - Shared IAM policies and per-cluster service identities
//! - Route 53 health checks and failover record sets
//!
//! There is no transaction spanning them. Instead every step is individually
//! idempotent, so a failed run is repaired by running it again.
//!
//! ## Modules
//!
//! - [`config`] - Immutable run configuration and region derivation
//! - [`orchestrator`] - The per-region pipeline and the failover controller
//! - [`providers`] - Traits for every external boundary plus CLI-backed implementations
//! - [`command`] - External command execution
//! - [`errors`] - Typed errors with stable reason codes
//! - [`metrics`] - Prometheus metrics
//! - [`cli`] - Command-line interface
//!
//! ## Example
//!
//! ```rust,no_run
//! use admission_fleet::config::{ImageRef, OrchestratorConfig};
//!
//! let config = OrchestratorConfig::new(
//!     vec!["us-east-1".to_string(), "us-west-2".to_string()],
//!     "webhook",
//!     "webhook-system",
//!     "example.com",
//!     ImageRef {
//!         registry: "ghcr.io/acme".to_string(),
//!         name: "admission-webhook".to_string(),
//!         tag: "1.4.2".to_string(),
//!     },
//! );
//!
//! for region in config.regions().unwrap() {
//!     println!("{} -> {}", region.cluster_name, region.hostname);
//! }
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod constants;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod orchestrator;
pub mod providers;

#[cfg(test)]
pub mod testing;

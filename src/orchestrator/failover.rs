// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health-check-driven DNS failover between two regional endpoints.
//!
//! This is one-time configuration. Once the records are in place the DNS
//! provider serves the PRIMARY record while its health check is healthy and
//! falls back to SECONDARY after consecutive failed probes; nothing here polls.
//!
//! Health checks are created with a caller reference derived from
//! `(domain, endpoint, role)`, so re-running the same setup returns the same
//! health checks instead of creating duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::credentials::hex_digest;
use crate::constants::{
    CALLER_REFERENCE_MAX_LEN, HEALTH_CHECK_FAILURE_THRESHOLD, HEALTH_CHECK_INTERVAL_SECS,
    HEALTH_CHECK_PORT,
};
use crate::errors::{ArtifactError, DnsError, FleetError};
use crate::providers::{
    ChangeAction, DnsProvider, FailoverRole, HealthCheckConfig, HealthCheckProtocol, HostResolver,
    RecordChange,
};

/// Whether the SECONDARY record is gated by its own health check.
///
/// Both health checks are always created; this only decides whether the
/// SECONDARY record references one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SecondaryHealthPolicy {
    /// SECONDARY is always eligible once PRIMARY is withdrawn
    #[default]
    Unmonitored,
    /// SECONDARY is only served while its own health check is healthy
    Monitored,
}

/// Input to [`FailoverController::establish_failover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverRequest {
    /// Global failover domain
    pub domain: String,
    /// Regional hostname served while healthy
    pub primary_host: String,
    /// Regional hostname served when the primary is withdrawn
    pub secondary_host: String,
    /// Hosted zone identifier
    pub zone_id: String,
    /// Health check request path
    pub health_check_path: String,
    /// TTL shared by both records
    pub ttl: u32,
    /// Secondary health-check association
    pub secondary_policy: SecondaryHealthPolicy,
}

/// Snapshot of a successful failover setup.
///
/// An audit record only; the DNS provider stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverConfig {
    pub domain: String,
    pub primary_endpoint: String,
    pub secondary_endpoint: String,
    pub primary_health_check_id: String,
    pub secondary_health_check_id: String,
    pub zone_id: String,
    pub ttl: u32,
    pub secondary_health_check: SecondaryHealthPolicy,
    pub created_at: DateTime<Utc>,
}

/// Configures provider-managed failover routing.
pub struct FailoverController {
    dns: Arc<dyn DnsProvider>,
    resolver: Arc<dyn HostResolver>,
}

impl FailoverController {
    #[must_use]
    pub fn new(dns: Arc<dyn DnsProvider>, resolver: Arc<dyn HostResolver>) -> Self {
        Self { dns, resolver }
    }

    /// Create both health checks and the PRIMARY/SECONDARY record pair.
    ///
    /// Endpoint addresses are resolved once, at configuration time. Both
    /// records are submitted in a single change batch.
    ///
    /// # Errors
    ///
    /// Returns a [`DnsError`] (wrapped in [`FleetError`]) if a health check
    /// cannot be created, an endpoint does not resolve to an IPv4 address, or
    /// the change batch is rejected.
    pub async fn establish_failover(
        &self,
        request: &FailoverRequest,
    ) -> Result<FailoverConfig, FleetError> {
        let primary_check = self
            .create_health_check(request, &request.primary_host, FailoverRole::Primary)
            .await?;
        let secondary_check = self
            .create_health_check(request, &request.secondary_host, FailoverRole::Secondary)
            .await?;

        let primary_address = self.first_ipv4(&request.primary_host).await?;
        let secondary_address = self.first_ipv4(&request.secondary_host).await?;

        let secondary_gate = match request.secondary_policy {
            SecondaryHealthPolicy::Monitored => Some(secondary_check.clone()),
            SecondaryHealthPolicy::Unmonitored => None,
        };
        let changes = [
            failover_record(
                request,
                FailoverRole::Primary,
                primary_address,
                Some(primary_check.clone()),
            ),
            failover_record(
                request,
                FailoverRole::Secondary,
                secondary_address,
                secondary_gate,
            ),
        ];
        self.dns
            .change_record_sets(&request.zone_id, &changes)
            .await?;

        info!(
            domain = %request.domain,
            zone = %request.zone_id,
            primary = %request.primary_host,
            secondary = %request.secondary_host,
            secondary_health_check = ?request.secondary_policy,
            "Failover routing established"
        );

        Ok(FailoverConfig {
            domain: request.domain.clone(),
            primary_endpoint: request.primary_host.clone(),
            secondary_endpoint: request.secondary_host.clone(),
            primary_health_check_id: primary_check,
            secondary_health_check_id: secondary_check,
            zone_id: request.zone_id.clone(),
            ttl: request.ttl,
            secondary_health_check: request.secondary_policy,
            created_at: Utc::now(),
        })
    }

    async fn create_health_check(
        &self,
        request: &FailoverRequest,
        endpoint: &str,
        role: FailoverRole,
    ) -> Result<String, DnsError> {
        let config = HealthCheckConfig {
            fqdn: endpoint.to_string(),
            port: HEALTH_CHECK_PORT,
            protocol: HealthCheckProtocol::Https,
            resource_path: request.health_check_path.clone(),
            request_interval_secs: HEALTH_CHECK_INTERVAL_SECS,
            failure_threshold: HEALTH_CHECK_FAILURE_THRESHOLD,
            enable_sni: true,
        };
        let reference = caller_reference(&request.domain, endpoint, role);
        let id = self.dns.create_health_check(&reference, &config).await?;
        info!(
            endpoint = %endpoint,
            role = %role,
            health_check = %id,
            "Health check ready"
        );
        Ok(id)
    }

    async fn first_ipv4(&self, host: &str) -> Result<IpAddr, DnsError> {
        let addresses = self.resolver.resolve(host).await?;
        let address = addresses
            .into_iter()
            .find(IpAddr::is_ipv4)
            .ok_or_else(|| DnsError::NoAddress {
                host: host.to_string(),
            })?;
        debug!(host = %host, address = %address, "Resolved endpoint");
        Ok(address)
    }
}

/// Idempotency token for a health check: stable across retries of the same setup.
#[must_use]
pub fn caller_reference(domain: &str, endpoint: &str, role: FailoverRole) -> String {
    let mut digest = hex_digest(&format!("{domain}|{endpoint}|{role}"));
    digest.truncate(CALLER_REFERENCE_MAX_LEN);
    digest
}

fn failover_record(
    request: &FailoverRequest,
    role: FailoverRole,
    address: IpAddr,
    health_check_id: Option<String>,
) -> RecordChange {
    RecordChange {
        action: ChangeAction::Upsert,
        name: request.domain.clone(),
        record_type: "A".to_string(),
        set_identifier: format!("{}-{}", request.domain, role.as_str().to_lowercase()),
        failover: role,
        ttl: request.ttl,
        value: address.to_string(),
        health_check_id,
    }
}

/// Write the snapshot as pretty JSON.
///
/// # Errors
///
/// Returns an [`ArtifactError`] if the snapshot cannot be serialized or written.
pub async fn write_failover_config(
    path: &Path,
    config: &FailoverConfig,
) -> Result<(), ArtifactError> {
    let rendered =
        serde_json::to_string_pretty(config).map_err(|e| ArtifactError::SerializeFailed {
            what: "failover configuration".to_string(),
            reason: e.to_string(),
        })?;
    let write_failed = |reason: String| ArtifactError::WriteFailed {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
    }
    tokio::fs::write(path, rendered)
        .await
        .map_err(|e| write_failed(e.to_string()))?;

    info!(path = %path.display(), "Wrote failover configuration");
    Ok(())
}

#[cfg(test)]
#[path = "failover_tests.rs"]
mod failover_tests;

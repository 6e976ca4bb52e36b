// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health checks and failover record sets through `aws route53`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{
    ChangeAction, DnsProvider, FailoverRole, HealthCheckConfig, HealthCheckProtocol, RecordChange,
};
use crate::command::{args, parse_json, CommandRunner};
use crate::errors::DnsError;

const AWS: &str = "aws";

/// Returned when a caller reference is reused with a different configuration
const ALREADY_EXISTS_MARKER: &str = "HealthCheckAlreadyExists";

/// Wire shape of `--health-check-config`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HealthCheckConfigPayload<'a> {
    #[serde(rename = "Type")]
    protocol: HealthCheckProtocol,
    fully_qualified_domain_name: &'a str,
    port: u16,
    resource_path: &'a str,
    request_interval: u32,
    failure_threshold: u32,
    #[serde(rename = "EnableSNI")]
    enable_sni: bool,
}

impl<'a> From<&'a HealthCheckConfig> for HealthCheckConfigPayload<'a> {
    fn from(config: &'a HealthCheckConfig) -> Self {
        Self {
            protocol: config.protocol,
            fully_qualified_domain_name: &config.fqdn,
            port: config.port,
            resource_path: &config.resource_path,
            request_interval: config.request_interval_secs,
            failure_threshold: config.failure_threshold,
            enable_sni: config.enable_sni,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecord<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecordSet<'a> {
    name: &'a str,
    #[serde(rename = "Type")]
    record_type: &'a str,
    set_identifier: &'a str,
    failover: FailoverRole,
    #[serde(rename = "TTL")]
    ttl: u32,
    resource_records: Vec<ResourceRecord<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_check_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Change<'a> {
    action: ChangeAction,
    resource_record_set: ResourceRecordSet<'a>,
}

/// Wire shape of `--change-batch`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeBatch<'a> {
    comment: String,
    changes: Vec<Change<'a>>,
}

impl<'a> ChangeBatch<'a> {
    fn new(changes: &'a [RecordChange]) -> Self {
        let comment = changes.first().map_or_else(
            || "admission-fleet".to_string(),
            |c| format!("Failover routing for {}", c.name),
        );
        Self {
            comment,
            changes: changes
                .iter()
                .map(|change| Change {
                    action: change.action,
                    resource_record_set: ResourceRecordSet {
                        name: &change.name,
                        record_type: &change.record_type,
                        set_identifier: &change.set_identifier,
                        failover: change.failover,
                        ttl: change.ttl,
                        resource_records: vec![ResourceRecord {
                            value: &change.value,
                        }],
                        health_check_id: change.health_check_id.as_deref(),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatedHealthCheck {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateHealthCheckOutput {
    health_check: CreatedHealthCheck,
}

/// Render the JSON `--change-batch` argument.
pub(crate) fn render_change_batch(changes: &[RecordChange]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ChangeBatch::new(changes))
}

/// Render the JSON `--health-check-config` argument.
pub(crate) fn render_health_check_config(
    config: &HealthCheckConfig,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&HealthCheckConfigPayload::from(config))
}

/// [`DnsProvider`] backed by the `aws route53` CLI.
#[derive(Clone)]
pub struct Route53Provider {
    runner: Arc<dyn CommandRunner>,
}

impl Route53Provider {
    /// Create a provider using `runner` for every CLI call.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn create_health_check(
        &self,
        caller_reference: &str,
        config: &HealthCheckConfig,
    ) -> Result<String, DnsError> {
        let creation_failed = |reason: String| DnsError::HealthCheckCreationFailed {
            endpoint: config.fqdn.clone(),
            reason,
        };
        let payload =
            render_health_check_config(config).map_err(|e| creation_failed(e.to_string()))?;
        let argv = args([
            "route53",
            "create-health-check",
            "--caller-reference",
            caller_reference,
            "--health-check-config",
            &payload,
            "--output",
            "json",
        ]);

        let output = match self.runner.run(AWS, &argv).await {
            Ok(output) => output,
            Err(e) if e.mentions(ALREADY_EXISTS_MARKER) => {
                return Err(DnsError::HealthCheckConflict {
                    caller_reference: caller_reference.to_string(),
                })
            }
            Err(e) => return Err(creation_failed(e.to_string())),
        };

        let created: CreateHealthCheckOutput =
            parse_json(AWS, &output).map_err(|e| creation_failed(e.to_string()))?;
        info!(
            endpoint = %config.fqdn,
            health_check_id = %created.health_check.id,
            "Health check ready"
        );
        Ok(created.health_check.id)
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        changes: &[RecordChange],
    ) -> Result<(), DnsError> {
        let record_name = changes.first().map(|c| c.name.clone()).unwrap_or_default();
        let change_failed = |reason: String| DnsError::RecordChangeFailed {
            zone: zone_id.to_string(),
            name: record_name.clone(),
            reason,
        };

        let batch = render_change_batch(changes).map_err(|e| change_failed(e.to_string()))?;
        let argv = args([
            "route53",
            "change-resource-record-sets",
            "--hosted-zone-id",
            zone_id,
            "--change-batch",
            &batch,
            "--output",
            "json",
        ]);
        self.runner
            .run(AWS, &argv)
            .await
            .map_err(|e| change_failed(e.to_string()))?;
        info!(zone = %zone_id, name = %record_name, changes = changes.len(), "Record sets changed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "route53_tests.rs"]
mod route53_tests;

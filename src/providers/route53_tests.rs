// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `route53.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::testing::ScriptedRunner;
    use serde_json::{json, Value};

    fn health_check() -> HealthCheckConfig {
        HealthCheckConfig {
            fqdn: "service-r1.example.com".to_string(),
            port: 443,
            protocol: HealthCheckProtocol::Https,
            resource_path: "/health".to_string(),
            request_interval_secs: 30,
            failure_threshold: 3,
            enable_sni: true,
        }
    }

    fn record(role: FailoverRole, value: &str, health_check_id: Option<&str>) -> RecordChange {
        RecordChange {
            action: ChangeAction::Upsert,
            name: "svc.example.com".to_string(),
            record_type: "A".to_string(),
            set_identifier: format!("svc-{}", role.as_str().to_lowercase()),
            failover: role,
            ttl: 60,
            value: value.to_string(),
            health_check_id: health_check_id.map(ToString::to_string),
        }
    }

    #[test]
    fn test_health_check_config_wire_format() {
        let rendered: Value =
            serde_json::from_str(&render_health_check_config(&health_check()).unwrap()).unwrap();

        assert_eq!(
            rendered,
            json!({
                "Type": "HTTPS",
                "FullyQualifiedDomainName": "service-r1.example.com",
                "Port": 443,
                "ResourcePath": "/health",
                "RequestInterval": 30,
                "FailureThreshold": 3,
                "EnableSNI": true
            })
        );
    }

    #[test]
    fn test_change_batch_wire_format() {
        let changes = vec![
            record(FailoverRole::Primary, "192.0.2.10", Some("hc-1")),
            record(FailoverRole::Secondary, "192.0.2.20", None),
        ];

        let rendered: Value = serde_json::from_str(&render_change_batch(&changes).unwrap()).unwrap();

        let primary = &rendered["Changes"][0];
        assert_eq!(primary["Action"], "UPSERT");
        assert_eq!(primary["ResourceRecordSet"]["Failover"], "PRIMARY");
        assert_eq!(primary["ResourceRecordSet"]["TTL"], 60);
        assert_eq!(primary["ResourceRecordSet"]["HealthCheckId"], "hc-1");
        assert_eq!(
            primary["ResourceRecordSet"]["ResourceRecords"][0]["Value"],
            "192.0.2.10"
        );

        let secondary = &rendered["Changes"][1]["ResourceRecordSet"];
        assert_eq!(secondary["Failover"], "SECONDARY");
        assert!(
            secondary.get("HealthCheckId").is_none(),
            "An unmonitored record must not carry a HealthCheckId key"
        );
        assert_eq!(rendered["Comment"], "Failover routing for svc.example.com");
    }

    #[tokio::test]
    async fn test_create_health_check_returns_id() {
        let runner = ScriptedRunner::new();
        runner.push_ok(r#"{"HealthCheck": {"Id": "abcd-1234", "CallerReference": "ref"}}"#);
        let provider = Route53Provider::new(runner.clone());

        let id = provider
            .create_health_check("ref", &health_check())
            .await
            .unwrap();

        assert_eq!(id, "abcd-1234");
        let argv = &runner.calls()[0].1;
        assert_eq!(argv[3], "ref");
    }

    #[tokio::test]
    async fn test_reused_caller_reference_is_conflict() {
        let runner = ScriptedRunner::new();
        runner.push_err("An error occurred (HealthCheckAlreadyExists)");
        let provider = Route53Provider::new(runner);

        let err = provider
            .create_health_check("ref", &health_check())
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::HealthCheckConflict { .. }));
    }

    #[tokio::test]
    async fn test_change_failure_names_zone_and_record() {
        let runner = ScriptedRunner::new();
        runner.push_err("InvalidChangeBatch");
        let provider = Route53Provider::new(runner);

        let err = provider
            .change_record_sets("Z1", &[record(FailoverRole::Primary, "192.0.2.10", None)])
            .await
            .unwrap_err();

        match err {
            DnsError::RecordChangeFailed { zone, name, .. } => {
                assert_eq!(zone, "Z1");
                assert_eq!(name, "svc.example.com");
            }
            other => panic!("Expected RecordChangeFailed, got {other:?}"),
        }
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `credentials.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::testing::FakeIdentity;
    use serde_json::json;

    fn cluster(name: &str) -> ClusterHandle {
        ClusterHandle {
            name: name.to_string(),
            region: "r1".to_string(),
            kube_context: name.to_string(),
        }
    }

    fn doc() -> serde_json::Value {
        json!({"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": ["route53:ListHostedZones"], "Resource": ["*"]}]})
    }

    #[tokio::test]
    async fn test_ensure_policy_creates_once_then_reuses() {
        let identity = Arc::new(FakeIdentity::default());
        let provisioner = CredentialProvisioner::new(identity.clone());

        let first = provisioner
            .ensure_policy("external-dns-policy", &doc())
            .await
            .unwrap();
        let second = provisioner
            .ensure_policy("external-dns-policy", &doc())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(identity.create_calls(), 1, "Second call must not create");
        assert_eq!(identity.policy_count("external-dns-policy"), 1);
    }

    #[tokio::test]
    async fn test_ensure_policy_reuses_policy_from_previous_run() {
        let identity = Arc::new(FakeIdentity::default());
        identity.with_policy("external-dns-policy", "arn:aws:iam::1:policy/external-dns-policy", doc());

        // A fresh provisioner has an empty cache, as in a new process.
        let provisioner = CredentialProvisioner::new(identity.clone());
        let policy = provisioner
            .ensure_policy("external-dns-policy", &doc())
            .await
            .unwrap();

        assert_eq!(policy.arn, "arn:aws:iam::1:policy/external-dns-policy");
        assert!(!policy.drifted);
        assert_eq!(identity.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_drift_is_reported_but_not_reconciled() {
        let identity = Arc::new(FakeIdentity::default());
        let stored = json!({"Version": "2012-10-17", "Statement": []});
        identity.with_policy("external-dns-policy", "arn:1", stored);
        let provisioner = CredentialProvisioner::new(identity.clone());

        let policy = provisioner
            .ensure_policy("external-dns-policy", &doc())
            .await
            .unwrap();

        assert!(policy.drifted);
        assert_eq!(policy.arn, "arn:1");
        assert_eq!(identity.create_calls(), 0, "Drift must never trigger a rewrite");
    }

    #[tokio::test]
    async fn test_duplicates_resolve_to_smallest_arn() {
        let identity = Arc::new(FakeIdentity::default());
        identity.with_policy("p", "arn:aws:iam::1:policy/p-b", doc());
        identity.with_policy("p", "arn:aws:iam::1:policy/p-a", doc());
        let provisioner = CredentialProvisioner::new(identity);

        let policy = provisioner.ensure_policy("p", &doc()).await.unwrap();

        assert_eq!(policy.arn, "arn:aws:iam::1:policy/p-a");
    }

    #[tokio::test]
    async fn test_lost_create_race_adopts_winner() {
        let identity = Arc::new(FakeIdentity::default());
        identity.lose_next_create("p", "arn:aws:iam::1:policy/p-winner");
        let provisioner = CredentialProvisioner::new(identity.clone());

        let policy = provisioner.ensure_policy("p", &doc()).await.unwrap();

        assert_eq!(policy.arn, "arn:aws:iam::1:policy/p-winner");
        assert_eq!(identity.create_calls(), 1);
        assert_eq!(identity.policy_count("p"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_create_once() {
        let identity = Arc::new(FakeIdentity::default());
        let provisioner = Arc::new(CredentialProvisioner::new(identity.clone()));

        let a = {
            let provisioner = provisioner.clone();
            tokio::spawn(async move { provisioner.ensure_policy("p", &doc()).await })
        };
        let b = {
            let provisioner = provisioner.clone();
            tokio::spawn(async move { provisioner.ensure_policy("p", &doc()).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        assert_eq!(a, b);
        assert_eq!(identity.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_bind_identity_is_an_upsert() {
        let identity = Arc::new(FakeIdentity::default());
        let provisioner = CredentialProvisioner::new(identity.clone());
        let policy = provisioner.ensure_policy("p", &doc()).await.unwrap();

        for _ in 0..2 {
            provisioner
                .bind_identity(&cluster("svc-r1"), "kube-system", "external-dns", &policy)
                .await
                .unwrap();
        }

        assert_eq!(identity.upsert_calls(), 2);
        let bindings = identity.bindings();
        assert_eq!(bindings.len(), 1, "Re-binding must not duplicate");
        assert_eq!(bindings[0].role_name, "svc-r1-external-dns");
        assert_eq!(bindings[0].policy_arn, policy.arn);
    }

    #[test]
    fn test_role_name_short_names_unchanged() {
        assert_eq!(role_name("svc-us-east-1", "external-dns"), "svc-us-east-1-external-dns");
    }

    #[test]
    fn test_role_name_long_names_truncated_deterministically() {
        let cluster = "a-very-long-cluster-prefix-for-the-admission-fleet-us-east-1";
        let first = role_name(cluster, "aws-load-balancer-controller");
        let second = role_name(cluster, "aws-load-balancer-controller");
        let other = role_name(cluster, "external-dns");

        assert!(first.len() <= 64, "Role name too long: {first}");
        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `components.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::ImageRef;
    use crate::testing::Fakes;

    fn setup() -> (OrchestratorConfig, Region, ClusterHandle) {
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
        let cluster = ClusterHandle {
            name: region.cluster_name.clone(),
            region: region.code.clone(),
            kube_context: region.cluster_name.clone(),
        };
        (config, region, cluster)
    }

    fn installer(fakes: &Fakes) -> ComponentInstaller {
        let providers = fakes.providers();
        ComponentInstaller::new(
            providers.installer,
            Arc::new(CredentialProvisioner::new(providers.identity)),
        )
    }

    fn set_value<'a>(request: &'a ReleaseRequest, key: &str) -> Option<&'a str> {
        request
            .set_values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_addons_install_in_dependency_order() {
        let fakes = Fakes::new();
        let (config, region, cluster) = setup();

        let reports = installer(&fakes)
            .install_platform_components(&config, &region, &cluster)
            .await
            .unwrap();

        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "cert-manager",
                "metrics-server",
                "aws-load-balancer-controller",
                "external-dns"
            ]
        );
        assert_eq!(
            fakes.installer.release_names(),
            vec!["cert-manager", "aws-load-balancer-controller", "external-dns"]
        );
        assert_eq!(fakes.installer.manifests().len(), 1);
        assert_eq!(
            fakes.installer.repositories(),
            vec!["jetstack", "eks", "external-dns"]
        );
    }

    #[tokio::test]
    async fn test_delegated_addons_get_policy_and_binding() {
        let fakes = Fakes::new();
        let (config, region, cluster) = setup();

        let reports = installer(&fakes)
            .install_platform_components(&config, &region, &cluster)
            .await
            .unwrap();

        assert_eq!(fakes.identity.policy_count("AWSLoadBalancerControllerIAMPolicy"), 1);
        assert_eq!(fakes.identity.policy_count("external-dns-policy"), 1);

        let mut accounts: Vec<_> = fakes
            .identity
            .bindings()
            .into_iter()
            .map(|b| (b.namespace, b.service_account))
            .collect();
        accounts.sort();
        assert_eq!(
            accounts,
            vec![
                ("kube-system".to_string(), "aws-load-balancer-controller".to_string()),
                ("kube-system".to_string(), "external-dns".to_string()),
            ]
        );
        assert!(reports[0].policy.is_none());
        assert!(reports[3].policy.is_some());
    }

    #[tokio::test]
    async fn test_release_parameters() {
        let fakes = Fakes::new();
        let (config, region, cluster) = setup();

        installer(&fakes)
            .install_platform_components(&config, &region, &cluster)
            .await
            .unwrap();

        let cert_manager = fakes.installer.last("cert-manager").unwrap().request;
        assert!(cert_manager.create_namespace);
        assert_eq!(set_value(&cert_manager, "installCRDs"), Some("true"));

        let lb = fakes
            .installer
            .last("aws-load-balancer-controller")
            .unwrap()
            .request;
        assert_eq!(set_value(&lb, "clusterName"), Some("svc-r1"));
        assert_eq!(
            set_value(&lb, "serviceAccount.create"),
            Some("false"),
            "The service account is owned by the identity binding"
        );

        let dns = fakes.installer.last("external-dns").unwrap().request;
        assert_eq!(set_value(&dns, "domainFilters[0]"), Some("example.com"));
        assert_eq!(set_value(&dns, "txtOwnerId"), Some("svc-r1"));
        assert_eq!(set_value(&dns, "policy"), Some("upsert-only"));
    }

    #[tokio::test]
    async fn test_second_run_upgrades_and_reuses_policies() {
        let fakes = Fakes::new();
        let (config, region, cluster) = setup();
        let installer = installer(&fakes);

        installer
            .install_platform_components(&config, &region, &cluster)
            .await
            .unwrap();
        let reports = installer
            .install_platform_components(&config, &region, &cluster)
            .await
            .unwrap();

        assert_eq!(
            reports[0].outcome,
            AddonOutcome::Release {
                outcome: ReleaseOutcome::Upgraded { revision: 2 }
            }
        );
        assert_eq!(fakes.identity.create_calls(), 2, "One create per policy name");
        assert_eq!(fakes.identity.bindings().len(), 2);
    }

    #[tokio::test]
    async fn test_policies_shared_across_regions() {
        let fakes = Fakes::new();
        let installer = installer(&fakes);
        let config = OrchestratorConfig::new(
            vec!["r1".to_string(), "r2".to_string()],
            "svc",
            "webhook-system",
            "example.com",
            setup().0.image,
        );

        for region in config.regions().unwrap() {
            let cluster = ClusterHandle {
                name: region.cluster_name.clone(),
                region: region.code.clone(),
                kube_context: region.cluster_name.clone(),
            };
            installer
                .install_platform_components(&config, &region, &cluster)
                .await
                .unwrap();
        }

        assert_eq!(fakes.identity.policy_count("external-dns-policy"), 1);
        assert_eq!(fakes.identity.bindings().len(), 4, "One binding per (cluster, add-on)");
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Values payload of the webhook release.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{ImageRef, WebhookSettings};
use crate::labels::{
    ALB_CERTIFICATE_ARN, ALB_SCHEME, ALB_SCHEME_INTERNET_FACING, ALB_TARGET_TYPE,
    ALB_TARGET_TYPE_IP, EXTERNAL_DNS_HOSTNAME,
};

/// Ingress class served by the load-balancer controller
const INGRESS_CLASS: &str = "alb";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageValues {
    pub repository: String,
    pub tag: String,
    pub pull_policy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPath {
    pub path: String,
    pub path_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressHost {
    pub host: String,
    pub paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressValues {
    pub enabled: bool,
    pub class_name: String,
    pub annotations: BTreeMap<String, String>,
    pub hosts: Vec<IngressHost>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBlock {
    /// Base64 CA the API server uses to verify the webhook
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
    /// Secret holding the serving certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_secret_name: Option<String>,
    /// Opaque service configuration
    pub config: WebhookSettings,
}

/// Complete values document for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookValues {
    pub image: ImageValues,
    pub region: String,
    pub ingress: IngressValues,
    pub webhook: WebhookBlock,
}

/// Per-region inputs to [`WebhookValues::render`].
#[derive(Debug, Clone, Copy)]
pub struct RegionalInputs<'a> {
    /// Region code
    pub region: &'a str,
    /// Public regional hostname
    pub hostname: &'a str,
    /// Certificate terminating TLS at the load balancer
    pub certificate_arn: &'a str,
    /// Base64 CA bundle, when a TLS bundle is configured
    pub ca_bundle: Option<&'a str>,
    /// TLS secret name, when a TLS bundle is configured
    pub tls_secret_name: Option<&'a str>,
}

impl WebhookValues {
    /// Bind image, region, hostname and certificate into the values payload.
    #[must_use]
    pub fn render(
        image: &ImageRef,
        settings: &WebhookSettings,
        inputs: RegionalInputs<'_>,
    ) -> Self {
        let annotations = BTreeMap::from([
            (ALB_SCHEME.to_string(), ALB_SCHEME_INTERNET_FACING.to_string()),
            (ALB_TARGET_TYPE.to_string(), ALB_TARGET_TYPE_IP.to_string()),
            (
                ALB_CERTIFICATE_ARN.to_string(),
                inputs.certificate_arn.to_string(),
            ),
            (EXTERNAL_DNS_HOSTNAME.to_string(), inputs.hostname.to_string()),
        ]);

        Self {
            image: ImageValues {
                repository: image.repository(),
                tag: image.tag.clone(),
                pull_policy: "IfNotPresent".to_string(),
            },
            region: inputs.region.to_string(),
            ingress: IngressValues {
                enabled: true,
                class_name: INGRESS_CLASS.to_string(),
                annotations,
                hosts: vec![IngressHost {
                    host: inputs.hostname.to_string(),
                    paths: vec![IngressPath {
                        path: "/".to_string(),
                        path_type: "Prefix".to_string(),
                    }],
                }],
            },
            webhook: WebhookBlock {
                ca_bundle: inputs.ca_bundle.map(ToString::to_string),
                tls_secret_name: inputs.tls_secret_name.map(ToString::to_string),
                config: settings.clone(),
            },
        }
    }

    /// Render as a YAML document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_yaml`.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Issued certificate lookup through `aws acm`.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{CertificateCatalog, CertificateSummary};
use crate::command::{args, parse_json, CommandRunner};
use crate::errors::CertificateError;

const AWS: &str = "aws";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedCertificate {
    certificate_arn: String,
    domain_name: String,
    #[serde(default)]
    subject_alternative_name_summaries: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListCertificatesOutput {
    #[serde(default)]
    certificate_summary_list: Vec<ListedCertificate>,
}

/// [`CertificateCatalog`] backed by the `aws acm` CLI.
#[derive(Clone)]
pub struct AcmCatalog {
    runner: Arc<dyn CommandRunner>,
}

impl AcmCatalog {
    /// Create a catalog using `runner` for every CLI call.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl CertificateCatalog for AcmCatalog {
    async fn list_certificates(
        &self,
        region: &str,
    ) -> Result<Vec<CertificateSummary>, CertificateError> {
        let argv = args([
            "acm",
            "list-certificates",
            "--region",
            region,
            "--certificate-statuses",
            "ISSUED",
            "--output",
            "json",
        ]);
        let lookup_failed = |reason: String| CertificateError::LookupFailed {
            region: region.to_string(),
            reason,
        };

        let output = self
            .runner
            .run(AWS, &argv)
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;
        let listed: ListCertificatesOutput =
            parse_json(AWS, &output).map_err(|e| lookup_failed(e.to_string()))?;

        Ok(listed
            .certificate_summary_list
            .into_iter()
            .map(|c| CertificateSummary {
                arn: c.certificate_arn,
                domain_name: c.domain_name,
                subject_alternative_names: c.subject_alternative_name_summaries,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[tokio::test]
    async fn test_list_certificates_parses_summaries() {
        let runner = ScriptedRunner::new();
        runner.push_ok(
            r#"{"CertificateSummaryList": [
                {"CertificateArn": "arn:acm:1", "DomainName": "service-r1.example.com",
                 "SubjectAlternativeNameSummaries": ["service-r1.example.com", "alt.example.com"]},
                {"CertificateArn": "arn:acm:2", "DomainName": "*.example.com"}
            ]}"#,
        );
        let catalog = AcmCatalog::new(runner.clone());

        let listed = catalog.list_certificates("r1").await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].subject_alternative_names.len(), 2);
        assert!(listed[1].subject_alternative_names.is_empty());
        assert!(runner.calls()[0].1.contains(&"ISSUED".to_string()));
    }

    #[tokio::test]
    async fn test_lookup_failure_names_region() {
        let runner = ScriptedRunner::new();
        runner.push_err("AccessDeniedException");
        let catalog = AcmCatalog::new(runner);

        let err = catalog.list_certificates("r1").await.unwrap_err();

        assert!(matches!(err, CertificateError::LookupFailed { region, .. } if region == "r1"));
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Identity policies through `aws iam`, service identities through `eksctl`.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{IdentityProvider, PolicySummary, ServiceIdentityBinding};
use crate::command::{args, parse_json, CommandRunner};
use crate::errors::IdentityError;

const AWS: &str = "aws";
const EKSCTL: &str = "eksctl";

/// Error code returned by IAM when a policy name is already taken
const ALREADY_EXISTS_MARKER: &str = "EntityAlreadyExists";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IamPolicy {
    policy_name: String,
    arn: String,
    default_version_id: Option<String>,
}

impl From<IamPolicy> for PolicySummary {
    fn from(policy: IamPolicy) -> Self {
        Self {
            name: policy.policy_name,
            arn: policy.arn,
            default_version_id: policy.default_version_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListPoliciesOutput {
    #[serde(default)]
    policies: Vec<IamPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatePolicyOutput {
    policy: IamPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyVersion {
    document: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetPolicyVersionOutput {
    policy_version: PolicyVersion,
}

/// [`IdentityProvider`] backed by the `aws` and `eksctl` CLIs.
#[derive(Clone)]
pub struct IamProvider {
    runner: Arc<dyn CommandRunner>,
}

impl IamProvider {
    /// Create a provider using `runner` for every CLI call.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// Build the `eksctl create iamserviceaccount` argument vector.
pub(crate) fn service_account_args(binding: &ServiceIdentityBinding) -> Vec<String> {
    args([
        "create",
        "iamserviceaccount",
        "--cluster",
        &binding.cluster,
        "--region",
        &binding.region,
        "--namespace",
        &binding.namespace,
        "--name",
        &binding.service_account,
        "--role-name",
        &binding.role_name,
        "--attach-policy-arn",
        &binding.policy_arn,
        "--override-existing-serviceaccounts",
        "--approve",
    ])
}

#[async_trait]
impl IdentityProvider for IamProvider {
    async fn list_policies(&self, name: &str) -> Result<Vec<PolicySummary>, IdentityError> {
        let argv = args(["iam", "list-policies", "--scope", "Local", "--output", "json"]);
        let lookup_failed = |reason: String| IdentityError::PolicyLookupFailed {
            name: name.to_string(),
            reason,
        };

        let output = self
            .runner
            .run(AWS, &argv)
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;
        let listed: ListPoliciesOutput =
            parse_json(AWS, &output).map_err(|e| lookup_failed(e.to_string()))?;

        Ok(listed
            .policies
            .into_iter()
            .filter(|p| p.policy_name == name)
            .map(PolicySummary::from)
            .collect())
    }

    async fn create_policy(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<PolicySummary, IdentityError> {
        info!(policy = %name, "Creating identity policy");
        let creation_failed = |reason: String| IdentityError::PolicyCreationFailed {
            name: name.to_string(),
            reason,
        };

        let rendered = document.to_string();
        let argv = args([
            "iam",
            "create-policy",
            "--policy-name",
            name,
            "--policy-document",
            &rendered,
            "--output",
            "json",
        ]);

        let output = match self.runner.run(AWS, &argv).await {
            Ok(output) => output,
            Err(e) if e.mentions(ALREADY_EXISTS_MARKER) => {
                return Err(IdentityError::PolicyConflict {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(creation_failed(e.to_string())),
        };

        let created: CreatePolicyOutput =
            parse_json(AWS, &output).map_err(|e| creation_failed(e.to_string()))?;
        Ok(created.policy.into())
    }

    async fn policy_document(
        &self,
        policy: &PolicySummary,
    ) -> Result<Option<serde_json::Value>, IdentityError> {
        let Some(version) = policy.default_version_id.as_deref() else {
            return Ok(None);
        };
        let unavailable = |reason: String| IdentityError::PolicyDocumentUnavailable {
            arn: policy.arn.clone(),
            reason,
        };

        let argv = args([
            "iam",
            "get-policy-version",
            "--policy-arn",
            &policy.arn,
            "--version-id",
            version,
            "--output",
            "json",
        ]);
        let output = self
            .runner
            .run(AWS, &argv)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let fetched: GetPolicyVersionOutput =
            parse_json(AWS, &output).map_err(|e| unavailable(e.to_string()))?;

        // Older CLI versions return the document as an embedded JSON string.
        let document = match fetched.policy_version.document {
            serde_json::Value::String(raw) => {
                serde_json::from_str(&raw).map_err(|e| unavailable(e.to_string()))?
            }
            other => other,
        };
        Ok(Some(document))
    }

    async fn upsert_service_account(
        &self,
        binding: &ServiceIdentityBinding,
    ) -> Result<(), IdentityError> {
        debug!(
            cluster = %binding.cluster,
            namespace = %binding.namespace,
            service_account = %binding.service_account,
            role = %binding.role_name,
            "Upserting service identity binding"
        );
        self.runner
            .run(EKSCTL, &service_account_args(binding))
            .await
            .map_err(|e| IdentityError::BindingFailed {
                cluster: binding.cluster.clone(),
                namespace: binding.namespace.clone(),
                service_account: binding.service_account.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "iam_tests.rs"]
mod iam_tests;

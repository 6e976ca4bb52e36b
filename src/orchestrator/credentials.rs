// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared identity policies and per-cluster service identity bindings.
//!
//! A policy name maps to exactly one logical policy across every region and
//! every run. [`CredentialProvisioner::ensure_policy`] therefore never trusts a
//! single "list, then create" pass:
//!
//! - Callers asking for the same name are serialised on a per-name lock and
//!   the resolved reference is cached for the rest of the run.
//! - A create that loses to another writer (`PolicyConflict`) re-lists and
//!   adopts the winner instead of failing.
//! - When duplicates already exist, the lexicographically smallest ARN is
//!   canonical on every run, and the duplicates are logged.
//!
//! An existing policy's stored document is compared against the intended one.
//! A mismatch is logged and counted but never corrected.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::constants::IAM_ROLE_NAME_MAX_LEN;
use crate::errors::IdentityError;
use crate::metrics::record_policy_drift;
use crate::providers::{
    ClusterHandle, IdentityProvider, PolicyRef, PolicySummary, ServiceIdentityBinding,
};

type PolicySlot = Arc<tokio::sync::Mutex<Option<PolicyRef>>>;

/// Resolves shared policies and binds service identities to them.
pub struct CredentialProvisioner {
    identity: Arc<dyn IdentityProvider>,
    slots: Mutex<HashMap<String, PolicySlot>>,
}

impl CredentialProvisioner {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, name: &str) -> PolicySlot {
        // A poisoned map only means another caller panicked mid-insert.
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        slots.entry(name.to_string()).or_default().clone()
    }

    /// Return the single policy named `name`, creating it from `document` if
    /// none exists.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] if the provider cannot list or create
    /// policies, or if a create conflicts and the winner is still not listed.
    pub async fn ensure_policy(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<PolicyRef, IdentityError> {
        let slot = self.slot(name);
        let mut cached = slot.lock().await;
        if let Some(policy) = cached.as_ref() {
            debug!(policy = %name, arn = %policy.arn, "Policy already resolved in this run");
            return Ok(policy.clone());
        }

        let resolved = self.resolve(name, document).await?;
        *cached = Some(resolved.clone());
        Ok(resolved)
    }

    async fn resolve(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<PolicyRef, IdentityError> {
        let mut existing = self.identity.list_policies(name).await?;

        if existing.is_empty() {
            match self.identity.create_policy(name, document).await {
                Ok(created) => {
                    info!(policy = %name, arn = %created.arn, "Created identity policy");
                    return Ok(PolicyRef {
                        name: created.name,
                        arn: created.arn,
                        drifted: false,
                    });
                }
                Err(IdentityError::PolicyConflict { .. }) => {
                    info!(policy = %name, "Policy created concurrently, adopting the existing one");
                    existing = self.identity.list_policies(name).await?;
                    if existing.is_empty() {
                        return Err(IdentityError::PolicyConflict {
                            name: name.to_string(),
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let canonical = canonical_policy(name, existing);
        let drifted = self.detect_drift(&canonical, document).await;
        Ok(PolicyRef {
            name: canonical.name,
            arn: canonical.arn,
            drifted,
        })
    }

    async fn detect_drift(&self, policy: &PolicySummary, intended: &serde_json::Value) -> bool {
        match self.identity.policy_document(policy).await {
            Ok(Some(stored)) if stored != *intended => {
                warn!(
                    policy = %policy.name,
                    arn = %policy.arn,
                    "Stored policy document differs from the intended document; leaving it unchanged"
                );
                record_policy_drift(&policy.name);
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(policy = %policy.name, error = %e, "Could not compare stored policy document");
                false
            }
        }
    }

    /// Bind `service_account` in `namespace` on `cluster` to `policy`.
    ///
    /// Re-running with the same parameters updates the existing binding.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::BindingFailed`] if the provider rejects the upsert.
    pub async fn bind_identity(
        &self,
        cluster: &ClusterHandle,
        namespace: &str,
        service_account: &str,
        policy: &PolicyRef,
    ) -> Result<ServiceIdentityBinding, IdentityError> {
        let binding = ServiceIdentityBinding {
            cluster: cluster.name.clone(),
            region: cluster.region.clone(),
            namespace: namespace.to_string(),
            service_account: service_account.to_string(),
            role_name: role_name(&cluster.name, service_account),
            policy_arn: policy.arn.clone(),
        };
        self.identity.upsert_service_account(&binding).await?;
        info!(
            cluster = %cluster.name,
            namespace = %namespace,
            service_account = %service_account,
            policy = %policy.name,
            "Service identity bound"
        );
        Ok(binding)
    }
}

/// Pick the smallest ARN among same-named policies, logging any duplicates.
fn canonical_policy(name: &str, mut policies: Vec<PolicySummary>) -> PolicySummary {
    policies.sort_by(|a, b| a.arn.cmp(&b.arn));
    let canonical = policies.remove(0);
    if !policies.is_empty() {
        let duplicates: Vec<&str> = policies.iter().map(|p| p.arn.as_str()).collect();
        warn!(
            policy = %name,
            canonical = %canonical.arn,
            duplicates = ?duplicates,
            "Multiple policies share this name; using the smallest ARN"
        );
    }
    canonical
}

/// Role name for a service account: `<cluster>-<service-account>`.
///
/// Names over the provider limit keep a prefix and end in a short digest of
/// the full name, so distinct bindings never collide after truncation.
#[must_use]
pub fn role_name(cluster: &str, service_account: &str) -> String {
    let full = format!("{cluster}-{service_account}");
    if full.len() <= IAM_ROLE_NAME_MAX_LEN {
        return full;
    }
    let digest = hex_digest(&full);
    let suffix = &digest[..8];
    let keep = IAM_ROLE_NAME_MAX_LEN - suffix.len() - 1;
    let prefix: String = full.chars().take(keep).collect();
    format!("{}-{suffix}", prefix.trim_end_matches('-'))
}

pub(crate) fn hex_digest(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;

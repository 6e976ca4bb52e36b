// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Direct control-plane access through the `kube` client.
//!
//! One [`Client`] is built per kubeconfig context on first use and reused for
//! the rest of the run.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams, PostParams};
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ClusterApi, ClusterHandle, EnsureOutcome};
use crate::constants::FIELD_MANAGER;
use crate::errors::ClusterApiError;
use crate::labels::{K8S_MANAGED_BY, MANAGED_BY_FLEET};

/// [`ClusterApi`] backed by `kube` clients built from the local kubeconfig.
#[derive(Default)]
pub struct KubeClusterApi {
    clients: Mutex<HashMap<String, Client>>,
}

impl KubeClusterApi {
    /// Create an API with no clients yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, cluster: &ClusterHandle) -> Result<Client, ClusterApiError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&cluster.kube_context) {
            return Ok(client.clone());
        }

        let connection_failed = |reason: String| ClusterApiError::ConnectionFailed {
            cluster: cluster.name.clone(),
            context: cluster.kube_context.clone(),
            reason,
        };
        let options = KubeConfigOptions {
            context: Some(cluster.kube_context.clone()),
            ..Default::default()
        };
        let config = Config::from_kubeconfig(&options)
            .await
            .map_err(|e| connection_failed(e.to_string()))?;
        let client = Client::try_from(config).map_err(|e| connection_failed(e.to_string()))?;

        debug!(cluster = %cluster.name, context = %cluster.kube_context, "Built cluster client");
        clients.insert(cluster.kube_context.clone(), client.clone());
        Ok(client)
    }
}

/// Namespace object labelled as managed by the orchestrator.
pub(crate) fn managed_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                K8S_MANAGED_BY.to_string(),
                MANAGED_BY_FLEET.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Server-side apply that takes ownership of every field it sets.
pub(crate) fn apply_params() -> PatchParams {
    PatchParams::apply(FIELD_MANAGER).force()
}

pub(crate) fn create_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn ensure_namespace(
        &self,
        cluster: &ClusterHandle,
        namespace: &str,
    ) -> Result<EnsureOutcome, ClusterApiError> {
        let client = self.client(cluster).await?;
        let api: Api<Namespace> = Api::all(client);

        match api
            .create(&create_params(), &managed_namespace(namespace))
            .await
        {
            Ok(_) => {
                info!(cluster = %cluster.name, namespace = %namespace, "Created namespace");
                Ok(EnsureOutcome::Created)
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!(cluster = %cluster.name, namespace = %namespace, "Namespace already exists");
                Ok(EnsureOutcome::Existing)
            }
            Err(e) => Err(ClusterApiError::NamespaceFailed {
                cluster: cluster.name.clone(),
                namespace: namespace.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn apply_secret(
        &self,
        cluster: &ClusterHandle,
        secret: &Secret,
    ) -> Result<(), ClusterApiError> {
        let namespace = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        let secret_failed = |reason: String| ClusterApiError::SecretFailed {
            cluster: cluster.name.clone(),
            namespace: namespace.clone(),
            name: name.clone(),
            reason,
        };
        if name.is_empty() || namespace.is_empty() {
            return Err(secret_failed(
                "secret must have a name and a namespace".to_string(),
            ));
        }

        let client = self.client(cluster).await?;
        let api: Api<Secret> = Api::namespaced(client, &namespace);

        api.patch(&name, &apply_params(), &Patch::Apply(secret))
            .await
            .map_err(|e| secret_failed(e.to_string()))?;
        info!(cluster = %cluster.name, "Applied Secret {}/{}", namespace, name);
        Ok(())
    }
}

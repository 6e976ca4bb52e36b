// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Webhook TLS material: loading the operator's bundle and rendering the
//! `kubernetes.io/tls` secret the release mounts.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::{ArtifactError, ConfigError};
use crate::labels::{
    COMPONENT_WEBHOOK_TLS, FLEET_REGION, K8S_COMPONENT, K8S_INSTANCE, K8S_MANAGED_BY, K8S_PART_OF,
    MANAGED_BY_FLEET,
};

/// CA certificate file and secret key
pub const CA_CERT_KEY: &str = "ca.crt";

/// Leaf certificate file and secret key
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Private key file and secret key
pub const TLS_KEY_KEY: &str = "tls.key";

/// Secret type expected by ingress controllers and webhook servers
const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// An already-issued CA, leaf certificate and key, treated as opaque bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsBundle {
    ca: Vec<u8>,
    cert: Vec<u8>,
    key: Vec<u8>,
}

impl std::fmt::Debug for TlsBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsBundle")
            .field("ca", &self.ca.len())
            .field("cert", &self.cert.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

impl TlsBundle {
    /// Read `ca.crt`, `tls.crt` and `tls.key` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTlsBundle`] if a file is missing, unreadable or empty.
    pub async fn load(dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            ca: read_part(dir, CA_CERT_KEY).await?,
            cert: read_part(dir, TLS_CERT_KEY).await?,
            key: read_part(dir, TLS_KEY_KEY).await?,
        })
    }

    /// CA certificate, base64-encoded for a webhook `caBundle`.
    #[must_use]
    pub fn ca_bundle(&self) -> String {
        BASE64.encode(&self.ca)
    }

    /// Render the secret holding this bundle.
    #[must_use]
    pub fn secret(&self, name: &str, namespace: &str, region: &str) -> Secret {
        let labels = BTreeMap::from([
            (K8S_MANAGED_BY.to_string(), MANAGED_BY_FLEET.to_string()),
            (K8S_PART_OF.to_string(), MANAGED_BY_FLEET.to_string()),
            (K8S_COMPONENT.to_string(), COMPONENT_WEBHOOK_TLS.to_string()),
            (K8S_INSTANCE.to_string(), name.to_string()),
            (FLEET_REGION.to_string(), region.to_string()),
        ]);
        let data = BTreeMap::from([
            (CA_CERT_KEY.to_string(), ByteString(self.ca.clone())),
            (TLS_CERT_KEY.to_string(), ByteString(self.cert.clone())),
            (TLS_KEY_KEY.to_string(), ByteString(self.key.clone())),
        ]);

        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            type_: Some(TLS_SECRET_TYPE.to_string()),
            data: Some(data),
            ..Default::default()
        }
    }
}

async fn read_part(dir: &Path, file: &str) -> Result<Vec<u8>, ConfigError> {
    let path = dir.join(file);
    let invalid = |reason: String| ConfigError::InvalidTlsBundle {
        path: path.display().to_string(),
        reason,
    };
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    if bytes.is_empty() {
        return Err(invalid("file is empty".to_string()));
    }
    Ok(bytes)
}

/// Write `secret` as YAML to `<dir>/<cluster>-webhook-tls.yaml`.
///
/// # Errors
///
/// Returns an [`ArtifactError`] if the manifest cannot be rendered or written.
pub async fn write_secret_manifest(
    dir: &Path,
    cluster: &str,
    secret: &Secret,
) -> Result<PathBuf, ArtifactError> {
    let rendered = serde_yaml::to_string(secret).map_err(|e| ArtifactError::SerializeFailed {
        what: "TLS secret manifest".to_string(),
        reason: e.to_string(),
    })?;
    let path = dir.join(format!("{cluster}-webhook-tls.yaml"));
    let write_failed = |reason: String| ArtifactError::WriteFailed {
        path: path.display().to_string(),
        reason,
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| write_failed(e.to_string()))?;
    tokio::fs::write(&path, rendered)
        .await
        .map_err(|e| write_failed(e.to_string()))?;

    info!(cluster = %cluster, path = %path.display(), "Wrote TLS secret manifest");
    Ok(path)
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tls_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Point-in-time hostname resolution through the system resolver.

use async_trait::async_trait;
use std::net::IpAddr;

use super::HostResolver;
use crate::constants::HEALTH_CHECK_PORT;
use crate::errors::DnsError;

/// [`HostResolver`] using `getaddrinfo` via `tokio::net::lookup_host`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let addresses = tokio::net::lookup_host((host, HEALTH_CHECK_PORT))
            .await
            .map_err(|e| DnsError::ResolutionFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let mut resolved: Vec<IpAddr> = Vec::new();
        for address in addresses {
            if !resolved.contains(&address.ip()) {
                resolved.push(address.ip());
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_literal_resolves_to_itself() {
        let resolved = SystemResolver.resolve("192.0.2.7").await.unwrap();

        assert_eq!(resolved, vec!["192.0.2.7".parse::<IpAddr>().unwrap()]);
    }
}

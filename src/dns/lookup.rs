//! Forward and NS lookups via hickory-resolver

use super::NameResolver;
use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::sync::Arc;

/// Error type for DNS operations
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    ResolutionError(String),

    /// The query succeeded but returned no usable records
    #[error("No {record} record found for {name}")]
    NotFound {
        /// Record type that was requested
        record: &'static str,
        /// Name that was queried
        name: String,
    },
}

/// Create a default DNS resolver
pub fn create_default_resolver() -> TokioResolver {
    TokioResolver::builder_with_config(
        ResolverConfig::cloudflare(),
        TokioConnectionProvider::default(),
    )
    .build()
}

/// [`NameResolver`] backed by a hickory Tokio resolver
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: Arc<TokioResolver>,
}

impl HickoryResolver {
    /// Create a resolver using Cloudflare's public servers
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(create_default_resolver()))
    }

    /// Use a specific resolver
    pub fn with_resolver(resolver: Arc<TokioResolver>) -> Self {
        Self { resolver }
    }
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver").finish_non_exhaustive()
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_root(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_string()
}

#[async_trait]
impl NameResolver for HickoryResolver {
    async fn name_servers(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        let lookup = self
            .resolver
            .ns_lookup(domain)
            .await
            .map_err(|e| DnsError::ResolutionError(e.to_string()))?;

        let servers: Vec<String> = lookup.iter().map(|ns| trim_root(&ns.0.to_string())).collect();
        if servers.is_empty() {
            return Err(DnsError::NotFound {
                record: "NS",
                name: domain.to_string(),
            });
        }

        for server in &servers {
            tracing::debug!(domain, server = %server, "Name server");
        }
        Ok(servers)
    }

    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let lookup = self
            .resolver
            .ipv4_lookup(host)
            .await
            .map_err(|e| DnsError::ResolutionError(e.to_string()))?;

        let addrs: Vec<IpAddr> = lookup.iter().map(|a| IpAddr::V4(a.0)).collect();
        if addrs.is_empty() {
            return Err(DnsError::NotFound {
                record: "A",
                name: host.to_string(),
            });
        }
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_root() {
        assert_eq!(trim_root("ns1.example.net."), "ns1.example.net");
        assert_eq!(trim_root("ns1.example.net"), "ns1.example.net");
    }

    #[test]
    fn test_error_display() {
        let err = DnsError::NotFound {
            record: "NS",
            name: "example.net".to_string(),
        };
        assert_eq!(err.to_string(), "No NS record found for example.net");
    }

    #[tokio::test]
    async fn test_resolve_invalid_tld() {
        let resolver = HickoryResolver::new();
        // .invalid never resolves (RFC 2606); offline runs fail too
        assert!(resolver.resolve("host.invalid").await.is_err());
        assert!(resolver.name_servers("example.invalid").await.is_err());
    }
}

//! DNS lookups used by the name-server fast path

pub mod lookup;

pub use lookup::{create_default_resolver, DnsError, HickoryResolver};

use async_trait::async_trait;
use std::net::IpAddr;

/// Forward and NS resolution
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Authoritative name servers for `domain`, in the order returned
    async fn name_servers(&self, domain: &str) -> Result<Vec<String>, DnsError>;

    /// IPv4 addresses for `host`, in the order returned
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError>;
}

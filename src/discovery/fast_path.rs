//! Name-server fast path
//!
//! Most operators host their own authoritative DNS, and name servers answer
//! pings far more often than random hosts in a prefix. The fast path finds
//! the organization's website in PeeringDB, looks up the name servers of
//! that domain, and probes the first one. A reply only counts when
//! geolocation confirms the server sits in the requested ASN, which filters
//! out third-party DNS providers.

use crate::asn::Asn;
use crate::dns::{DnsError, NameResolver};
use crate::scan::BatchScanner;
use crate::services::Services;
use crate::sources::{Geolocator, LocationRecord, PeeringRegistry, SourceError};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Reasons the fast path gave up
#[derive(Debug, thiserror::Error)]
pub enum FastPathError {
    /// PeeringDB has no website for the ASN
    #[error("no website registered")]
    NoWebsite,

    /// The registered website has no usable hostname
    #[error("website {0:?} has no hostname")]
    InvalidWebsite(String),

    /// The domain has no name servers
    #[error("no name server found for {0}")]
    NoNameServer(String),

    /// The name server did not answer the probe
    #[error("{0} is not reachable")]
    Unreachable(String),

    /// The name server belongs to another network
    #[error("{host} is announced by {organization:?}, not the requested ASN")]
    AsnMismatch {
        /// Name-server hostname
        host: String,
        /// Organization reported by geolocation
        organization: String,
    },

    /// Upstream HTTP source failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// DNS lookup failed
    #[error(transparent)]
    Dns(#[from] DnsError),
}

/// A name server that answered and belongs to the ASN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathHit {
    /// Name-server hostname
    pub host: String,
    /// Address the hostname resolved to
    pub ip: IpAddr,
    /// Geolocation of `ip`, already fetched for the ASN check
    pub location: LocationRecord,
}

/// Probes an organization's authoritative name server
#[derive(Clone)]
pub struct NameServerProbe {
    registry: Arc<dyn PeeringRegistry>,
    dns: Arc<dyn NameResolver>,
    geo: Arc<dyn Geolocator>,
    scanner: BatchScanner,
}

impl NameServerProbe {
    /// Create the fast path from the shared services
    pub fn new(services: &Services, scanner: BatchScanner) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            dns: Arc::clone(&services.dns),
            geo: Arc::clone(&services.geo),
            scanner,
        }
    }

    /// Try to find a reachable name server inside `asn`
    ///
    /// Every failure is non-fatal: it is logged and reported as `None` so
    /// the caller can fall back to sweeping.
    pub async fn try_fast_path(&self, asn: Asn) -> Option<FastPathHit> {
        match self.attempt(asn).await {
            Ok(hit) => {
                info!(%asn, host = %hit.host, ip = %hit.ip, "Name server answered");
                Some(hit)
            }
            Err(reason) => {
                info!(%asn, %reason, "Name-server fast path failed");
                None
            }
        }
    }

    async fn attempt(&self, asn: Asn) -> Result<FastPathHit, FastPathError> {
        let website = self
            .registry
            .website(asn)
            .await?
            .ok_or(FastPathError::NoWebsite)?;

        let domain = registered_domain(&website)
            .ok_or_else(|| FastPathError::InvalidWebsite(website.clone()))?;

        let host = self
            .dns
            .name_servers(&domain)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FastPathError::NoNameServer(domain.clone()))?;

        // Only the first address is used, even if the server has several
        let ip = self
            .dns
            .resolve(&host)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                FastPathError::Dns(DnsError::NotFound {
                    record: "A",
                    name: host.clone(),
                })
            })?;

        let results = self.scanner.scan(&[ip]).await;
        if !results.get(&ip).copied().unwrap_or(false) {
            return Err(FastPathError::Unreachable(host));
        }

        let location = self.geo.locate(ip).await?;
        let organization = location.organization.clone().unwrap_or_default();
        if !asn.appears_in(&organization) {
            return Err(FastPathError::AsnMismatch { host, organization });
        }

        Ok(FastPathHit { host, ip, location })
    }
}

impl std::fmt::Debug for NameServerProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameServerProbe").finish_non_exhaustive()
    }
}

/// The hostname of an organization website, without a leading `www.`
///
/// Accepts full URLs as well as bare hostnames, which PeeringDB records
/// sometimes contain.
pub fn registered_domain(website: &str) -> Option<String> {
    let website = website.trim();
    let url = match Url::parse(website) {
        Ok(url) if url.has_host() => url,
        _ => Url::parse(&format!("http://{website}")).ok()?,
    };

    let host = url.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    let domain = match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    };

    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

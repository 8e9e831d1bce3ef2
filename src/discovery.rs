//! Liveness discovery for ASNs

pub mod aggregate;
pub mod engine;
pub mod fast_path;
pub mod report;
pub mod sweep;

use crate::asn::Asn;
use crate::sources::{LocationRecord, SourceError};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

// Re-export commonly used types
pub use aggregate::{CountryAggregate, CountryEntry, UNKNOWN_COUNTRY};
pub use engine::Discoverer;
pub use fast_path::{FastPathError, FastPathHit, NameServerProbe};
pub use report::{AsnOutcome, AsnReport, DiscoveryReport};
pub use sweep::PrefixSweep;

/// Strategy that produced a discovery result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The organization's authoritative name server answered
    NameServer,
    /// A host inside an announced prefix answered
    PrefixSweep,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::NameServer => write!(f, "name server"),
            Strategy::PrefixSweep => write!(f, "prefix sweep"),
        }
    }
}

/// The single reachable address found for an ASN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// ASN the address belongs to
    pub asn: Asn,
    /// Address as recorded in the aggregate (hostname for name-server hits)
    pub address: String,
    /// IP that answered the probe
    pub ip: IpAddr,
    /// How it was found
    pub strategy: Strategy,
    /// Geolocation of `ip`
    pub location: LocationRecord,
}

/// Upstream failures that stop discovery for one ASN
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Announced prefixes could not be fetched
    #[error("failed to fetch announced prefixes: {0}")]
    Prefixes(#[source] SourceError),

    /// The discovered address could not be geolocated
    #[error("failed to geolocate {ip}: {source}")]
    Geolocation {
        /// Address that was looked up
        ip: IpAddr,
        /// Underlying error
        #[source]
        source: SourceError,
    },
}

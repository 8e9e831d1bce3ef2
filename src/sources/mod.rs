//! Upstream HTTP data sources
//!
//! Each source is a thin request/response wrapper behind a trait so the
//! discovery engine can run against in-memory doubles in tests.

pub mod ipinfo;
pub mod peeringdb;
pub mod ripe;

pub use ipinfo::IpInfo;
pub use peeringdb::PeeringDb;
pub use ripe::RipeStat;

use crate::asn::Asn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Error type for upstream source requests
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Upstream answered with a non-success status
    #[error("{service} returned HTTP {status}")]
    Status {
        /// Name of the upstream service
        service: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// Failed to parse the response body
    #[error("Failed to parse {service} response: {reason}")]
    ParseError {
        /// Name of the upstream service
        service: &'static str,
        /// Parser message
        reason: String,
    },

    /// Request timeout
    #[error("Request timed out")]
    Timeout,
}

impl SourceError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::HttpError(e.to_string())
        }
    }
}

/// Location attributes for an IP address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// City name
    #[serde(default)]
    pub city: String,
    /// Region or state
    #[serde(default)]
    pub region: String,
    /// Country (ISO code as reported by the service)
    #[serde(default)]
    pub country: String,
    /// Organization string, typically `"AS<number> <name>"`
    #[serde(default, rename = "org", skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

/// Source of the prefixes an ASN announces
#[async_trait]
pub trait PrefixSource: Send + Sync {
    /// Prefixes announced by `asn` since `start_time` (Unix seconds) and
    /// seen by at least `min_peers` peers, in upstream order
    async fn announced_prefixes(
        &self,
        asn: Asn,
        start_time: u64,
        min_peers: u32,
    ) -> Result<Vec<String>, SourceError>;
}

/// Registry of network operators
#[async_trait]
pub trait PeeringRegistry: Send + Sync {
    /// The organization website registered for `asn`, if any
    async fn website(&self, asn: Asn) -> Result<Option<String>, SourceError>;
}

/// IP geolocation service
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Locate `ip`
    async fn locate(&self, ip: IpAddr) -> Result<LocationRecord, SourceError>;
}

/// Build the HTTP client shared by all sources
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("asnping/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SourceError::HttpError(e.to_string()))
}

/// Send a GET and decode the JSON body, mapping failures onto [`SourceError`]
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    service: &'static str,
) -> Result<T, SourceError> {
    let response = request.send().await.map_err(SourceError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            service,
            status: status.as_u16(),
        });
    }

    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            SourceError::ParseError {
                service,
                reason: e.to_string(),
            }
        } else {
            SourceError::from_reqwest(e)
        }
    })
}

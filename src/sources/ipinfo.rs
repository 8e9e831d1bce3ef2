//! ipinfo.io geolocation client

use super::{get_json, Geolocator, LocationRecord, SourceError};
use async_trait::async_trait;
use std::net::IpAddr;

/// Default ipinfo.io base URL
pub const IPINFO_BASE_URL: &str = "https://ipinfo.io";

/// Client for ipinfo.io
#[derive(Debug, Clone)]
pub struct IpInfo {
    client: reqwest::Client,
    base_url: String,
}

impl IpInfo {
    /// Create a client against the public ipinfo.io service
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, IPINFO_BASE_URL)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, ip: IpAddr) -> String {
        format!("{}/{}/json", self.base_url.trim_end_matches('/'), ip)
    }
}

#[async_trait]
impl Geolocator for IpInfo {
    async fn locate(&self, ip: IpAddr) -> Result<LocationRecord, SourceError> {
        let record: LocationRecord = get_json(self.client.get(self.url_for(ip)), "ipinfo").await?;
        tracing::debug!(
            %ip,
            city = %record.city,
            region = %record.region,
            country = %record.country,
            "Located address"
        );
        Ok(record)
    }
}

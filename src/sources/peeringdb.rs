//! PeeringDB network registry client

use super::{get_json, PeeringRegistry, SourceError};
use crate::asn::Asn;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

/// Default PeeringDB `net` endpoint
pub const PEERINGDB_NET_URL: &str = "https://www.peeringdb.com/api/net";

#[derive(Debug, Deserialize)]
struct NetResponse {
    #[serde(default)]
    data: Vec<NetRecord>,
}

#[derive(Debug, Deserialize)]
struct NetRecord {
    #[serde(default)]
    website: String,
}

impl NetResponse {
    fn into_website(self) -> Option<String> {
        self.data
            .into_iter()
            .next()
            .map(|net| net.website.trim().to_string())
            .filter(|website| !website.is_empty())
    }
}

/// Client for PeeringDB network records
#[derive(Debug, Clone)]
pub struct PeeringDb {
    client: reqwest::Client,
    endpoint: String,
}

impl PeeringDb {
    /// Create a client against the public PeeringDB API
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, PEERINGDB_NET_URL)
    }

    /// Create a client against a custom endpoint
    pub fn with_endpoint(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PeeringRegistry for PeeringDb {
    async fn website(&self, asn: Asn) -> Result<Option<String>, SourceError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("asn", asn.number())]);

        let body: NetResponse = get_json(request, "PeeringDB").await?;
        let website = body.into_website();

        match &website {
            Some(site) => info!(%asn, website = %site, "Found website"),
            None => info!(%asn, "No website found"),
        }
        Ok(website)
    }
}

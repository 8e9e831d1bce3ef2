//! RIPEstat announced-prefixes client

use super::{get_json, PrefixSource, SourceError};
use crate::asn::Asn;
use async_trait::async_trait;
use serde::Deserialize;

/// Default RIPEstat announced-prefixes endpoint
pub const RIPESTAT_ANNOUNCED_PREFIXES_URL: &str =
    "https://stat.ripe.net/data/announced-prefixes/data.json";

#[derive(Debug, Deserialize)]
struct AnnouncedPrefixes {
    data: AnnouncedPrefixesData,
}

#[derive(Debug, Deserialize)]
struct AnnouncedPrefixesData {
    #[serde(default)]
    prefixes: Vec<AnnouncedPrefix>,
}

#[derive(Debug, Deserialize)]
struct AnnouncedPrefix {
    prefix: String,
}

/// Client for the RIPEstat announced-prefixes data call
#[derive(Debug, Clone)]
pub struct RipeStat {
    client: reqwest::Client,
    endpoint: String,
}

impl RipeStat {
    /// Create a client against the public RIPEstat endpoint
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, RIPESTAT_ANNOUNCED_PREFIXES_URL)
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
impl PrefixSource for RipeStat {
    async fn announced_prefixes(
        &self,
        asn: Asn,
        start_time: u64,
        min_peers: u32,
    ) -> Result<Vec<String>, SourceError> {
        let request = self.client.get(&self.endpoint).query(&[
            ("data_overload_limit", "ignore".to_string()),
            ("resource", asn.to_string()),
            ("starttime", start_time.to_string()),
            ("min_peers_seeing", min_peers.to_string()),
        ]);

        let body: AnnouncedPrefixes = get_json(request, "RIPEstat").await?;
        let prefixes = body
            .data
            .prefixes
            .into_iter()
            .map(|p| p.prefix)
            .collect::<Vec<_>>();

        tracing::debug!(%asn, count = prefixes.len(), "Fetched announced prefixes");
        Ok(prefixes)
    }
}

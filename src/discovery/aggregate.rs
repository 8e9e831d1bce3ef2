//! Per-country accumulation of discovered addresses

use crate::asn::Asn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Key used when geolocation reports no country
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// One discovered address and the ASN it was found for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryEntry {
    /// Reachable IP address, or name-server hostname for fast-path hits
    pub address: String,
    /// ASN the address was discovered for
    pub asn: Asn,
}

/// Mapping from country to the (address, ASN) pairs found there
///
/// Entries within a country keep the order in which ASNs were processed.
/// The aggregate only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountryAggregate {
    countries: BTreeMap<String, Vec<CountryEntry>>,
}

impl CountryAggregate {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under `country`
    pub fn record(&mut self, country: &str, address: impl Into<String>, asn: Asn) {
        let country = match country.trim() {
            "" => UNKNOWN_COUNTRY,
            trimmed => trimmed,
        };
        self.countries
            .entry(country.to_string())
            .or_default()
            .push(CountryEntry {
                address: address.into(),
                asn,
            });
    }

    /// Entries recorded for `country`
    pub fn get(&self, country: &str) -> &[CountryEntry] {
        self.countries
            .get(country)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate over countries in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CountryEntry])> {
        self.countries
            .iter()
            .map(|(country, entries)| (country.as_str(), entries.as_slice()))
    }

    /// Number of countries
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Total number of entries across all countries
    pub fn entry_count(&self) -> usize {
        self.countries.values().map(Vec::len).sum()
    }
}

impl fmt::Display for CountryAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (country, entries) in self.iter() {
            let list = entries
                .iter()
                .map(|e| format!("{} ({})", e.address, e.asn))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "{country:<8} {list}")?;
        }
        Ok(())
    }
}

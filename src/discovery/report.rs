//! Results of a full discovery run

use super::aggregate::CountryAggregate;
use super::Strategy;
use crate::asn::Asn;
use serde::Serialize;

/// What happened for a single ASN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AsnOutcome {
    /// A reachable address was found and recorded
    Found {
        /// Recorded address
        address: String,
        /// Strategy that found it
        strategy: Strategy,
        /// Country it was recorded under
        country: String,
    },
    /// Both strategies were exhausted
    NotFound,
    /// An upstream source failed and the ASN was skipped
    Failed {
        /// Error message
        reason: String,
    },
}

/// Outcome for one ASN, in processing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsnReport {
    /// The ASN
    pub asn: Asn,
    /// What happened
    #[serde(flatten)]
    pub outcome: AsnOutcome,
}

/// Final output of a discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// Addresses found, grouped by country
    pub countries: CountryAggregate,
    /// Per-ASN outcomes in input order
    pub asns: Vec<AsnReport>,
}

impl DiscoveryReport {
    /// Number of ASNs for which an address was found
    pub fn found_count(&self) -> usize {
        self.asns
            .iter()
            .filter(|r| matches!(r.outcome, AsnOutcome::Found { .. }))
            .count()
    }

    /// ASNs that produced no address, with their outcome
    pub fn unresolved(&self) -> impl Iterator<Item = &AsnReport> {
        self.asns
            .iter()
            .filter(|r| !matches!(r.outcome, AsnOutcome::Found { .. }))
    }
}

//! Autonomous System Number parsing
//!
//! ASNs arrive on the command line either bare (`64500`) or with the
//! registry prefix (`AS64500`). Both forms are parsed once into [`Asn`],
//! and each upstream service receives the representation it expects.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error type for ASN parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsnParseError {
    /// Input was empty after trimming
    #[error("ASN is empty")]
    Empty,

    /// Input was not a valid 32-bit AS number
    #[error("Invalid ASN: {0}")]
    Invalid(String),

    /// A comma-separated list contained no ASNs
    #[error("No ASNs provided")]
    NoneProvided,
}

/// A 32-bit Autonomous System Number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Asn(u32);

impl Asn {
    /// Create an ASN from its numeric value
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// The numeric AS number, as PeeringDB expects it
    pub const fn number(self) -> u32 {
        self.0
    }

    /// Whether an organization string (e.g. `"AS15169 Google LLC"`) names this ASN
    ///
    /// This is a plain substring match on the `AS<number>` form, so
    /// `AS6450` is also found inside `AS64500`.
    pub fn appears_in(self, organization: &str) -> bool {
        organization
            .to_ascii_uppercase()
            .contains(&self.to_string())
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

impl FromStr for Asn {
    type Err = AsnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AsnParseError::Empty);
        }

        let digits = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("AS") => &trimmed[2..],
            _ => trimmed,
        };

        digits
            .parse::<u32>()
            .map(Asn)
            .map_err(|_| AsnParseError::Invalid(trimmed.to_string()))
    }
}

impl From<u32> for Asn {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

impl Serialize for Asn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a single ASN or a comma-separated list, preserving input order
///
/// Empty entries (e.g. a trailing comma) are ignored. Duplicates are kept;
/// each occurrence is processed in turn.
pub fn parse_asn_list(input: &str) -> Result<Vec<Asn>, AsnParseError> {
    let asns = input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Asn>, _>>()?;

    if asns.is_empty() {
        return Err(AsnParseError::NoneProvided);
    }
    Ok(asns)
}

//! asnping - find a live, pingable address inside an Autonomous System
//!
//! For each ASN the library first probes the authoritative name server of
//! the operator's website, then falls back to sweeping the announced
//! prefixes in small concurrent batches. Every address found is geolocated
//! and grouped by country.
//!
//! # Example
//!
//! ```no_run
//! use asnping::{parse_asn_list, Discoverer, DiscoveryConfig, Services};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiscoveryConfig::default();
//! let services = Services::new(&config)?;
//! let discoverer = Discoverer::new(services, config);
//!
//! let report = discoverer.run(&parse_asn_list("13335,15169")?).await;
//! print!("{}", report.countries);
//! # Ok(())
//! # }
//! ```

pub mod asn;
pub mod config;
pub mod discovery;
pub mod dns;
pub mod probe;
pub mod scan;
pub mod services;
pub mod socket;
pub mod sources;

// Re-export core types for library users
pub use asn::{parse_asn_list, Asn, AsnParseError};
pub use config::{DiscoveryConfig, DiscoveryConfigBuilder};
pub use discovery::{
    AsnOutcome, AsnReport, CountryAggregate, CountryEntry, Discoverer, DiscoveryError,
    DiscoveryReport, DiscoveryResult, Strategy,
};
pub use dns::{DnsError, NameResolver};
pub use probe::Prober;
pub use scan::{BatchScanner, ProbeResults};
pub use services::Services;
pub use socket::{IcmpPinger, SocketMode};
pub use sources::{
    Geolocator, LocationRecord, PeeringRegistry, PrefixSource, SourceError,
};

//! Discovery orchestration
//!
//! Each ASN is handled on its own: the name-server fast path runs first,
//! the prefix sweep only when it comes up empty, and whatever address is
//! found gets geolocated and appended to the country aggregate. ASNs are
//! processed strictly one after another.

use super::aggregate::CountryAggregate;
use super::fast_path::NameServerProbe;
use super::report::{AsnOutcome, AsnReport, DiscoveryReport};
use super::sweep::PrefixSweep;
use super::{DiscoveryError, DiscoveryResult, Strategy};
use crate::asn::Asn;
use crate::config::DiscoveryConfig;
use crate::scan::BatchScanner;
use crate::services::Services;
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Runs both discovery strategies for a list of ASNs
#[derive(Debug, Clone)]
pub struct Discoverer {
    services: Services,
    config: DiscoveryConfig,
    fast_path: NameServerProbe,
    sweep: PrefixSweep,
}

impl Discoverer {
    /// Create a discoverer using `services` and `config`
    pub fn new(services: Services, config: DiscoveryConfig) -> Self {
        let scanner = BatchScanner::new(services.prober.clone());
        let fast_path = NameServerProbe::new(&services, scanner.clone());
        let sweep = PrefixSweep::new(scanner, config.batch_size);

        Self {
            services,
            config,
            fast_path,
            sweep,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Find one reachable address for `asn`
    ///
    /// Returns `Ok(None)` when both strategies are exhausted. Announced
    /// prefixes are only fetched when the fast path fails.
    pub async fn discover(&self, asn: Asn) -> Result<Option<DiscoveryResult>, DiscoveryError> {
        if let Some(hit) = self.fast_path.try_fast_path(asn).await {
            return Ok(Some(DiscoveryResult {
                asn,
                address: hit.host,
                ip: hit.ip,
                strategy: Strategy::NameServer,
                location: hit.location,
            }));
        }

        let prefixes = self
            .services
            .prefixes
            .announced_prefixes(asn, start_time(self.config.lookback), self.config.min_peers)
            .await
            .map_err(DiscoveryError::Prefixes)?;
        debug!(%asn, count = prefixes.len(), "Fast path failed, sweeping prefixes");

        let Some(found) = self.sweep.sweep(&prefixes).await else {
            warn!(%asn, "No pingable IP found");
            return Ok(None);
        };

        let ip = IpAddr::V4(found);
        let location = self
            .services
            .geo
            .locate(ip)
            .await
            .map_err(|source| DiscoveryError::Geolocation { ip, source })?;

        Ok(Some(DiscoveryResult {
            asn,
            address: ip.to_string(),
            ip,
            strategy: Strategy::PrefixSweep,
            location,
        }))
    }

    /// Discover `asn` and fold the result into `aggregate`
    ///
    /// The aggregate is returned unchanged unless an address was found.
    pub async fn process(
        &self,
        asn: Asn,
        mut aggregate: CountryAggregate,
    ) -> (CountryAggregate, AsnOutcome) {
        let outcome = match self.discover(asn).await {
            Ok(Some(result)) => {
                info!(
                    %asn,
                    address = %result.address,
                    city = %result.location.city,
                    country = %result.location.country,
                    strategy = %result.strategy,
                    "Found pingable address"
                );
                aggregate.record(&result.location.country, result.address.clone(), asn);
                AsnOutcome::Found {
                    address: result.address,
                    strategy: result.strategy,
                    country: result.location.country,
                }
            }
            Ok(None) => AsnOutcome::NotFound,
            Err(e) => {
                warn!(%asn, error = %e, "Skipping ASN");
                AsnOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        (aggregate, outcome)
    }

    /// Process every ASN in order and collect the report
    pub async fn run(&self, asns: &[Asn]) -> DiscoveryReport {
        let mut countries = CountryAggregate::new();
        let mut reports = Vec::with_capacity(asns.len());

        for &asn in asns {
            let (next, outcome) = self.process(asn, countries).await;
            countries = next;
            reports.push(AsnReport { asn, outcome });
        }

        DiscoveryReport {
            countries,
            asns: reports,
        }
    }
}

/// Unix timestamp `lookback` before now
pub fn start_time(lookback: Duration) -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .saturating_sub(lookback)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DnsError, NameResolver};
    use crate::probe::Prober;
    use crate::sources::{
        Geolocator, LocationRecord, PeeringRegistry, PrefixSource, SourceError,
    };
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replies from a fixed set, optionally slowly
    struct FakeProber {
        reachable: HashSet<IpAddr>,
        delay: Duration,
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, addr: IpAddr) -> bool {
            tokio::time::sleep(self.delay).await;
            self.reachable.contains(&addr)
        }
    }

    #[derive(Default)]
    struct FakePrefixes {
        prefixes: HashMap<Asn, Vec<String>>,
        failing: HashSet<Asn>,
        calls: Mutex<Vec<(Asn, u64, u32)>>,
    }

    #[async_trait]
    impl PrefixSource for FakePrefixes {
        async fn announced_prefixes(
            &self,
            asn: Asn,
            start_time: u64,
            min_peers: u32,
        ) -> Result<Vec<String>, SourceError> {
            self.calls.lock().unwrap().push((asn, start_time, min_peers));
            if self.failing.contains(&asn) {
                return Err(SourceError::Timeout);
            }
            Ok(self.prefixes.get(&asn).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeRegistry(HashMap<Asn, String>);

    #[async_trait]
    impl PeeringRegistry for FakeRegistry {
        async fn website(&self, asn: Asn) -> Result<Option<String>, SourceError> {
            Ok(self.0.get(&asn).cloned())
        }
    }

    #[derive(Default)]
    struct FakeDns {
        ns: HashMap<String, String>,
        a: HashMap<String, IpAddr>,
    }

    #[async_trait]
    impl NameResolver for FakeDns {
        async fn name_servers(&self, domain: &str) -> Result<Vec<String>, DnsError> {
            Ok(self.ns.get(domain).cloned().into_iter().collect())
        }

        async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
            Ok(self.a.get(host).copied().into_iter().collect())
        }
    }

    #[derive(Default)]
    struct FakeGeo {
        records: HashMap<IpAddr, (String, String)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geolocator for FakeGeo {
        async fn locate(&self, ip: IpAddr) -> Result<LocationRecord, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (country, org) = self.records.get(&ip).cloned().ok_or(SourceError::Status {
                service: "ipinfo",
                status: 404,
            })?;
            Ok(LocationRecord {
                city: "Somewhere".to_string(),
                region: "Region".to_string(),
                country,
                organization: Some(org),
            })
        }
    }

    struct World {
        reachable: Vec<&'static str>,
        delay: Duration,
        prefixes: FakePrefixes,
        registry: FakeRegistry,
        dns: FakeDns,
        geo: FakeGeo,
    }

    impl World {
        fn new() -> Self {
            Self {
                reachable: Vec::new(),
                delay: Duration::ZERO,
                prefixes: FakePrefixes::default(),
                registry: FakeRegistry::default(),
                dns: FakeDns::default(),
                geo: FakeGeo::default(),
            }
        }

        /// AS64500 has a reachable name server located in NL
        fn with_name_server_asn(mut self) -> Self {
            let asn = Asn::new(64500);
            self.registry
                .0
                .insert(asn, "https://www.example.net".to_string());
            self.dns
                .ns
                .insert("example.net".to_string(), "ns1.example.net".to_string());
            self.dns
                .a
                .insert("ns1.example.net".to_string(), ip("192.0.2.53"));
            self.geo.records.insert(
                ip("192.0.2.53"),
                ("NL".to_string(), "AS64500 Example Networks".to_string()),
            );
            self.reachable.push("192.0.2.53");
            self.prefixes
                .prefixes
                .insert(asn, vec!["192.0.2.0/24".to_string()]);
            self
        }

        /// AS64501 only answers in its second prefix, located in US
        fn with_sweep_asn(mut self) -> Self {
            self.prefixes.prefixes.insert(
                Asn::new(64501),
                vec![
                    "2001:db8::/32".to_string(),
                    "198.51.100.0/24".to_string(),
                ],
            );
            self.geo.records.insert(
                ip("198.51.100.7"),
                ("US".to_string(), "AS64501 Sweep Co".to_string()),
            );
            self.reachable.push("198.51.100.7");
            self
        }

        fn build(self) -> (Discoverer, Arc<FakePrefixes>, Arc<FakeGeo>) {
            let prefixes = Arc::new(self.prefixes);
            let geo = Arc::new(self.geo);
            let services = Services {
                prober: Arc::new(FakeProber {
                    reachable: self.reachable.iter().map(|s| ip(s)).collect(),
                    delay: self.delay,
                }),
                prefixes: prefixes.clone(),
                registry: Arc::new(self.registry),
                geo: geo.clone(),
                dns: Arc::new(self.dns),
            };
            (
                Discoverer::new(services, DiscoveryConfig::default()),
                prefixes,
                geo,
            )
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_fast_path_skips_sweep() {
        let (discoverer, prefixes, geo) = World::new().with_name_server_asn().build();

        let result = discoverer.discover(Asn::new(64500)).await.unwrap().unwrap();

        assert_eq!(result.address, "ns1.example.net");
        assert_eq!(result.ip, ip("192.0.2.53"));
        assert_eq!(result.strategy, Strategy::NameServer);
        assert_eq!(result.location.country, "NL");
        assert!(prefixes.calls.lock().unwrap().is_empty());
        assert_eq!(geo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sweep_result_is_geolocated() {
        let (discoverer, prefixes, _) = World::new().with_sweep_asn().build();

        let result = discoverer.discover(Asn::new(64501)).await.unwrap().unwrap();

        assert_eq!(result.address, "198.51.100.7");
        assert_eq!(result.strategy, Strategy::PrefixSweep);
        assert_eq!(result.location.country, "US");

        let calls = prefixes.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Asn::new(64501));
        assert_eq!(calls[0].2, 10);
    }

    #[tokio::test]
    async fn test_aggregate_follows_processing_order() {
        let mut world = World::new().with_name_server_asn().with_sweep_asn();
        // Fast-path probes take longer than the whole sweep would
        world.delay = Duration::from_millis(5);
        let (discoverer, _, _) = world.build();

        let asns = crate::asn::parse_asn_list("64500,64501").unwrap();
        let report = discoverer.run(&asns).await;

        assert_eq!(report.countries.len(), 2);
        assert_eq!(report.countries.get("NL")[0].address, "ns1.example.net");
        assert_eq!(report.countries.get("NL")[0].asn, Asn::new(64500));
        assert_eq!(report.countries.get("US")[0].address, "198.51.100.7");
        assert_eq!(report.asns[0].asn, Asn::new(64500));
        assert_eq!(report.asns[1].asn, Asn::new(64501));
        assert_eq!(report.found_count(), 2);
    }

    #[tokio::test]
    async fn test_same_country_entries_keep_input_order() {
        let mut world = World::new().with_name_server_asn().with_sweep_asn();
        world.geo.records.insert(
            ip("198.51.100.7"),
            ("NL".to_string(), "AS64501 Sweep Co".to_string()),
        );
        let (discoverer, _, _) = world.build();

        let report = discoverer.run(&[Asn::new(64501), Asn::new(64500)]).await;

        let nl = report.countries.get("NL");
        assert_eq!(nl.len(), 2);
        assert_eq!(nl[0].asn, Asn::new(64501));
        assert_eq!(nl[1].asn, Asn::new(64500));
    }

    #[tokio::test]
    async fn test_nothing_found_leaves_aggregate_unchanged() {
        let (discoverer, prefixes, geo) = World::new().build();

        assert!(discoverer.discover(Asn::new(64502)).await.unwrap().is_none());

        let mut before = CountryAggregate::new();
        before.record("DE", "203.0.113.1", Asn::new(64499));
        let (after, outcome) = discoverer.process(Asn::new(64502), before.clone()).await;

        assert_eq!(after, before);
        assert_eq!(outcome, AsnOutcome::NotFound);
        assert_eq!(prefixes.calls.lock().unwrap().len(), 2);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prefix_failure_skips_asn_and_continues() {
        let mut world = World::new().with_sweep_asn();
        world.prefixes.failing.insert(Asn::new(64502));
        let (discoverer, _, _) = world.build();

        let report = discoverer.run(&[Asn::new(64502), Asn::new(64501)]).await;

        assert!(matches!(
            &report.asns[0].outcome,
            AsnOutcome::Failed { reason } if reason.contains("announced prefixes")
        ));
        assert!(matches!(report.asns[1].outcome, AsnOutcome::Found { .. }));
        assert_eq!(report.countries.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_geolocation_failure_after_sweep() {
        let mut world = World::new().with_sweep_asn();
        world.geo.records.clear();
        let (discoverer, _, _) = world.build();

        let err = discoverer.discover(Asn::new(64501)).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Geolocation { ip: addr, .. } if addr == ip("198.51.100.7")));
    }

    #[tokio::test]
    async fn test_fast_path_mismatch_falls_back_to_sweep() {
        let mut world = World::new().with_name_server_asn();
        world.geo.records.insert(
            ip("192.0.2.53"),
            ("US".to_string(), "AS13335 Cloudflare, Inc.".to_string()),
        );
        world.reachable.push("192.0.2.1");
        world.geo.records.insert(
            ip("192.0.2.1"),
            ("NL".to_string(), "AS64500 Example Networks".to_string()),
        );
        let (discoverer, prefixes, _) = world.build();

        let result = discoverer.discover(Asn::new(64500)).await.unwrap().unwrap();

        assert_eq!(result.strategy, Strategy::PrefixSweep);
        assert_eq!(result.address, "192.0.2.1");
        assert_eq!(prefixes.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_start_time() {
        let unix_now = || {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
        };
        let lookback = 24 * 3600;

        let before = unix_now();
        let start = start_time(Duration::from_secs(lookback));
        let after = unix_now();

        assert!(start >= before - lookback);
        assert!(start <= after - lookback);
        assert_eq!(start_time(Duration::from_secs(u64::MAX)), 0);
    }
}

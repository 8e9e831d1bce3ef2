//! Prefix sweep fallback
//!
//! Walks the announced prefixes in order and probes host suffixes .1
//! through .254 of each prefix's /24 base, one batch at a time, stopping at
//! the first batch that produces a reply.

use crate::scan::{BatchScanner, ProbeResults};
use ipnet::Ipv4Net;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, warn};

/// First host suffix probed in each /24
pub const FIRST_HOST_SUFFIX: u8 = 1;
/// Last host suffix probed in each /24
pub const LAST_HOST_SUFFIX: u8 = 254;

/// Brute-force sweep over announced prefixes
#[derive(Debug, Clone)]
pub struct PrefixSweep {
    scanner: BatchScanner,
    batch_size: usize,
}

impl PrefixSweep {
    /// Create a sweep that probes up to `batch_size` addresses at once
    pub fn new(scanner: BatchScanner, batch_size: usize) -> Self {
        Self {
            scanner,
            batch_size: batch_size.max(1),
        }
    }

    /// Return the first responsive address across `prefixes`, if any
    ///
    /// IPv6 and unparseable prefixes are skipped without probing. Within a
    /// batch that has several replies the lowest address wins.
    pub async fn sweep<S: AsRef<str>>(&self, prefixes: &[S]) -> Option<Ipv4Addr> {
        for prefix in prefixes {
            let prefix = prefix.as_ref();
            let Some(base) = sweep_base(prefix) else {
                continue;
            };

            debug!(prefix, %base, "Sweeping prefix");
            for batch in host_batches(base, self.batch_size) {
                let addrs: Vec<IpAddr> = batch.into_iter().map(IpAddr::V4).collect();
                let results = self.scanner.scan(&addrs).await;
                if let Some(hit) = first_reachable(&results) {
                    debug!(prefix, %hit, "Found reachable host");
                    return Some(hit);
                }
            }
            debug!(prefix, "No reachable host in prefix");
        }
        None
    }
}

/// The /24 base (last octet zeroed) of an IPv4 prefix's address
///
/// Returns `None` for IPv6 prefixes and for strings that are not CIDR
/// blocks. Prefixes narrower than /24 map to their enclosing /24.
pub fn sweep_base(prefix: &str) -> Option<Ipv4Addr> {
    if prefix.contains(':') {
        debug!(prefix, "Skipping IPv6 prefix");
        return None;
    }

    match prefix.trim().parse::<Ipv4Net>() {
        Ok(net) => {
            let [a, b, c, _] = net.addr().octets();
            Some(Ipv4Addr::new(a, b, c, 0))
        }
        Err(e) => {
            warn!(prefix, error = %e, "Skipping unparseable prefix");
            None
        }
    }
}

/// Split suffixes 1..=254 of `base` into probe batches
///
/// Suffix 1 is probed alone, the remaining hosts in consecutive groups of
/// up to `batch_size`.
pub fn host_batches(base: Ipv4Addr, batch_size: usize) -> Vec<Vec<Ipv4Addr>> {
    let [a, b, c, _] = base.octets();
    let host = |suffix: u8| Ipv4Addr::new(a, b, c, suffix);

    let rest: Vec<Ipv4Addr> = (FIRST_HOST_SUFFIX + 1..=LAST_HOST_SUFFIX)
        .map(host)
        .collect();

    let mut batches = vec![vec![host(FIRST_HOST_SUFFIX)]];
    batches.extend(rest.chunks(batch_size.max(1)).map(<[Ipv4Addr]>::to_vec));
    batches
}

fn first_reachable(results: &ProbeResults) -> Option<Ipv4Addr> {
    results
        .iter()
        .filter(|(_, reachable)| **reachable)
        .filter_map(|(addr, _)| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .min()
}

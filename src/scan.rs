//! Concurrent batch probing
//!
//! [`BatchScanner::scan`] launches one task per address, waits for every
//! task to finish, and returns the full result map. There is no early
//! return inside a batch: callers that want to stop on the first reply do
//! so between batches.

use crate::probe::Prober;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

/// Reachability outcome for every address in one batch
pub type ProbeResults = HashMap<IpAddr, bool>;

/// Runs a [`Prober`] over a batch of addresses in parallel
#[derive(Clone)]
pub struct BatchScanner {
    prober: Arc<dyn Prober>,
}

impl BatchScanner {
    /// Create a scanner backed by `prober`
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// Probe every address concurrently and wait for all of them
    ///
    /// The result holds exactly one entry per distinct input address. A
    /// task that panics is recorded as unreachable.
    pub async fn scan(&self, addresses: &[IpAddr]) -> ProbeResults {
        let unique: HashSet<IpAddr> = addresses.iter().copied().collect();
        let results = Arc::new(Mutex::new(HashMap::with_capacity(unique.len())));

        let handles = unique.iter().map(|&addr| {
            let prober = Arc::clone(&self.prober);
            let results = Arc::clone(&results);
            tokio::spawn(async move {
                let reachable = prober.probe(addr).await;
                results
                    .lock()
                    .expect("mutex poisoned")
                    .insert(addr, reachable);
            })
        });

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!(error = %e, "Probe task failed");
            }
        }

        let mut results = std::mem::take(&mut *results.lock().expect("mutex poisoned"));
        for addr in unique {
            results.entry(addr).or_insert(false);
        }

        trace!(
            batch = results.len(),
            reachable = results.values().filter(|r| **r).count(),
            "Batch complete"
        );
        results
    }
}

impl std::fmt::Debug for BatchScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScanner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replies from a fixed set of addresses after a short delay
    struct SlowProber {
        reachable: HashSet<IpAddr>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        completed: AtomicUsize,
    }

    impl SlowProber {
        fn new(reachable: &[&str]) -> Self {
            Self {
                reachable: reachable.iter().map(|s| s.parse().unwrap()).collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, addr: IpAddr) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            self.reachable.contains(&addr)
        }
    }

    struct PanickingProber;

    #[async_trait]
    impl Prober for PanickingProber {
        async fn probe(&self, addr: IpAddr) -> bool {
            if addr == IpAddr::from([10, 0, 0, 2]) {
                panic!("probe blew up");
            }
            true
        }
    }

    fn addrs(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_one_entry_per_address() {
        let prober = Arc::new(SlowProber::new(&["10.0.0.3"]));
        let scanner = BatchScanner::new(prober.clone());

        let input = addrs(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);
        let results = scanner.scan(&input).await;

        assert_eq!(results.len(), 4);
        assert!(results[&input[2]]);
        assert_eq!(results.values().filter(|r| **r).count(), 1);
    }

    #[tokio::test]
    async fn test_waits_for_every_probe() {
        let prober = Arc::new(SlowProber::new(&["10.0.0.1"]));
        let scanner = BatchScanner::new(prober.clone());

        let input = addrs(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        let _ = scanner.scan(&input).await;

        assert_eq!(prober.completed.load(Ordering::SeqCst), 3);
        assert_eq!(prober.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probes_run_concurrently() {
        let prober = Arc::new(SlowProber::new(&[]));
        let scanner = BatchScanner::new(prober.clone());

        let input: Vec<IpAddr> = (1..=10u8).map(|i| IpAddr::from([10, 0, 0, i])).collect();
        let _ = scanner.scan(&input).await;

        assert!(prober.max_in_flight.load(Ordering::SeqCst) > 1);
        assert!(prober.max_in_flight.load(Ordering::SeqCst) <= 10);
    }

    #[tokio::test]
    async fn test_duplicates_collapse() {
        let prober = Arc::new(SlowProber::new(&[]));
        let scanner = BatchScanner::new(prober.clone());

        let results = scanner
            .scan(&addrs(&["10.0.0.1", "10.0.0.1", "10.0.0.2"]))
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(prober.completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let scanner = BatchScanner::new(Arc::new(SlowProber::new(&[])));
        assert!(scanner.scan(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_probe_is_unreachable() {
        let scanner = BatchScanner::new(Arc::new(PanickingProber));
        let input = addrs(&["10.0.0.1", "10.0.0.2"]);
        let results = scanner.scan(&input).await;

        assert_eq!(results.len(), 2);
        assert!(results[&input[0]]);
        assert!(!results[&input[1]]);
    }
}

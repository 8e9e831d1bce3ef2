//! Service container for discovery runs
//!
//! Bundles the prober and every upstream collaborator behind their traits,
//! so the discovery engine only ever sees `Arc<dyn ...>` handles. Tests
//! swap any of them for in-memory doubles.

use crate::config::DiscoveryConfig;
use crate::dns::{HickoryResolver, NameResolver};
use crate::probe::Prober;
use crate::socket::IcmpPinger;
use crate::sources::{
    http_client, Geolocator, IpInfo, PeeringDb, PeeringRegistry, PrefixSource, RipeStat,
    SourceError,
};
use std::sync::Arc;

/// Container for all services used during discovery
#[derive(Clone)]
pub struct Services {
    /// Reachability prober
    pub prober: Arc<dyn Prober>,
    /// Announced-prefix source
    pub prefixes: Arc<dyn PrefixSource>,
    /// Peering registry (organization websites)
    pub registry: Arc<dyn PeeringRegistry>,
    /// Geolocation service
    pub geo: Arc<dyn Geolocator>,
    /// DNS resolver
    pub dns: Arc<dyn NameResolver>,
}

impl Services {
    /// Create the production services for `config`
    ///
    /// All HTTP sources share one client with the configured timeout.
    pub fn new(config: &DiscoveryConfig) -> Result<Self, SourceError> {
        let client = http_client(config.http_timeout)?;

        Ok(Self {
            prober: Arc::new(IcmpPinger::new(config.probe_timeout)),
            prefixes: Arc::new(RipeStat::new(client.clone())),
            registry: Arc::new(PeeringDb::new(client.clone())),
            geo: Arc::new(IpInfo::new(client)),
            dns: Arc::new(HickoryResolver::new()),
        })
    }

    /// Replace the prober
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    /// Replace the DNS resolver
    pub fn with_resolver(mut self, dns: Arc<dyn NameResolver>) -> Self {
        self.dns = dns;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

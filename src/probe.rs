//! Reachability probing interface
//!
//! A [`Prober`] answers one question about one address: did it reply to a
//! single echo request in time? Implementations never fail; every error is
//! folded into "not reachable".

use async_trait::async_trait;
use std::net::IpAddr;

/// Single-shot reachability check
#[async_trait]
pub trait Prober: Send + Sync {
    /// Send one echo request to `addr` and report whether a reply arrived
    async fn probe(&self, addr: IpAddr) -> bool;
}

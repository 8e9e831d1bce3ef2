//! ICMP socket layer for reachability probes

pub mod icmp;
pub mod utils;

pub use icmp::IcmpPinger;

use serde::{Deserialize, Serialize};
use socket2::Type;

/// Socket mode (affects permissions required)
///
/// - **Raw**: always requires root or CAP_NET_RAW
/// - **Dgram**: ICMP datagram sockets; on Linux the caller's group must be
///   inside `net.ipv4.ping_group_range`, on macOS no privilege is needed
///
/// Either way a probe that cannot open its socket is reported as
/// unreachable rather than aborting the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketMode {
    /// Raw socket
    Raw,
    /// Datagram socket for ICMP
    Dgram,
}

impl SocketMode {
    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            SocketMode::Raw => "Raw ICMP",
            SocketMode::Dgram => "Datagram ICMP",
        }
    }

    pub(crate) fn socket_type(self) -> Type {
        match self {
            SocketMode::Raw => Type::RAW,
            SocketMode::Dgram => Type::DGRAM,
        }
    }
}

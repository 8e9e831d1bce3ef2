//! Utility functions for socket operations

use socket2::{Domain, Protocol, Socket};

use super::SocketMode;

/// Check if running as root
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe {
            extern "C" {
                fn geteuid() -> u32;
            }
            geteuid() == 0
        }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Return the first socket mode this process is allowed to open, if any
///
/// Used once at startup to warn that every probe is going to come back
/// unreachable; individual probes still degrade on their own.
pub fn available_icmp_mode() -> Option<SocketMode> {
    [SocketMode::Dgram, SocketMode::Raw]
        .into_iter()
        .find(|mode| Socket::new(Domain::IPV4, mode.socket_type(), Some(Protocol::ICMPV4)).is_ok())
}

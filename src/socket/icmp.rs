//! ICMP echo prober using a fresh socket per probe
//!
//! Each probe opens its own ICMP socket, sends a single Echo Request and
//! polls for the matching Echo Reply until the probe timeout expires. The
//! socket is dropped when the probe finishes, so nothing is pooled between
//! probes and a permission failure only affects the probe that hit it.

use super::SocketMode;
use crate::probe::Prober;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;
use pnet::util::checksum as pnet_checksum;
use socket2::{Domain, Protocol, Socket as Socket2};
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Size of ICMP echo payload
const ICMP_ECHO_PAYLOAD_SIZE: usize = 16;
/// Receive buffer size, large enough for any reply on a standard MTU
const RECV_BUFFER_SIZE: usize = 1500;
/// Delay between non-blocking receive attempts
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reachability prober that sends one ICMP Echo Request per address
#[derive(Debug)]
pub struct IcmpPinger {
    timeout: Duration,
    identifier: u16,
    sequence: AtomicU16,
    modes: Vec<SocketMode>,
}

impl IcmpPinger {
    /// Create a pinger that waits up to `timeout` for each reply
    ///
    /// Unprivileged datagram sockets are tried first, then raw sockets.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            identifier: std::process::id() as u16,
            sequence: AtomicU16::new(0),
            modes: vec![SocketMode::Dgram, SocketMode::Raw],
        }
    }

    /// Restrict the pinger to a single socket mode
    pub fn with_socket_mode(mut self, mode: SocketMode) -> Self {
        self.modes = vec![mode];
        self
    }

    /// The per-probe reply timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn open_socket(&self) -> Result<(Socket2, SocketMode)> {
        let mut last_error = None;
        for mode in &self.modes {
            match Socket2::new(Domain::IPV4, mode.socket_type(), Some(Protocol::ICMPV4)) {
                Ok(socket) => return Ok((socket, *mode)),
                Err(e) => last_error = Some((*mode, e)),
            }
        }

        match last_error {
            Some((_, e)) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(anyhow!(
                "ICMP requires root or CAP_NET_RAW capability (or a matching \
                 net.ipv4.ping_group_range)"
            )),
            Some((mode, e)) => Err(anyhow::Error::new(e)
                .context(format!("Failed to create {} socket", mode.description()))),
            None => Err(anyhow!("No socket mode configured")),
        }
    }

    async fn echo(&self, target: Ipv4Addr) -> Result<bool> {
        let (socket, mode) = self.open_socket()?;
        socket.set_nonblocking(true)?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let packet = build_echo_request(self.identifier, sequence)?;

        let dest = SocketAddr::new(IpAddr::V4(target), 0);
        socket
            .send_to(&packet, &dest.into())
            .context("Failed to send ICMP packet")?;

        trace!(%target, sequence, mode = mode.description(), "Sent ICMP echo");

        // Datagram sockets on Linux rewrite the identifier, so only raw
        // sockets can rely on it.
        let matcher = ReplyMatcher {
            target,
            identifier: self.identifier,
            sequence,
            check_identifier: mode == SocketMode::Raw,
        };

        match tokio::time::timeout(self.timeout, wait_for_reply(&socket, &matcher)).await {
            Ok(result) => result,
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl Prober for IcmpPinger {
    async fn probe(&self, addr: IpAddr) -> bool {
        let target = match addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => {
                debug!(%addr, "IPv6 targets are not supported");
                return false;
            }
        };

        match self.echo(target).await {
            Ok(true) => {
                debug!(%addr, "Echo reply received");
                true
            }
            Ok(false) => {
                debug!(%addr, "is not reachable");
                false
            }
            Err(e) => {
                let error = format!("{e:#}");
                debug!(%addr, %error, "Probe failed");
                false
            }
        }
    }
}

/// Identifies the Echo Reply belonging to one probe
#[derive(Debug, Clone, Copy)]
struct ReplyMatcher {
    target: Ipv4Addr,
    identifier: u16,
    sequence: u16,
    check_identifier: bool,
}

impl ReplyMatcher {
    /// Whether `data` is the reply to this probe
    ///
    /// Raw sockets (and datagram sockets on macOS) deliver the IPv4 header
    /// in front of the ICMP message; Linux datagram sockets do not.
    fn matches(&self, data: &[u8]) -> bool {
        let Some(icmp) = strip_ipv4_header(data) else {
            return false;
        };
        let Some(reply) = EchoReplyPacket::new(icmp) else {
            return false;
        };

        reply.get_icmp_type() == IcmpTypes::EchoReply
            && reply.get_sequence_number() == self.sequence
            && (!self.check_identifier || reply.get_identifier() == self.identifier)
    }
}

fn strip_ipv4_header(data: &[u8]) -> Option<&[u8]> {
    // ICMP types never start with 0x4_, so a version nibble of 4 means an IP header
    if data.first()? >> 4 != 4 {
        return Some(data);
    }
    let header = Ipv4Packet::new(data)?;
    let header_len = usize::from(header.get_header_length()) * 4;
    data.get(header_len..)
}

async fn wait_for_reply(socket: &Socket2, matcher: &ReplyMatcher) -> Result<bool> {
    let mut buf = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_SIZE];

    loop {
        match socket.recv_from(&mut buf) {
            Ok((size, from)) => {
                // SAFETY: recv_from initialised the first `size` bytes of `buf`
                let data = unsafe { std::slice::from_raw_parts(buf.as_ptr().cast::<u8>(), size) };
                let from = from.as_socket_ipv4().map(|addr| *addr.ip());
                if from == Some(matcher.target) && matcher.matches(data) {
                    return Ok(true);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                tokio::time::sleep(RECV_POLL_INTERVAL).await;
            }
            Err(e) => return Err(e).context("Failed to receive ICMP reply"),
        }
    }
}

/// Build an ICMP Echo Request with a valid checksum
fn build_echo_request(identifier: u16, sequence: u16) -> Result<Vec<u8>> {
    let mut icmp_buf =
        vec![0u8; MutableEchoRequestPacket::minimum_packet_size() + ICMP_ECHO_PAYLOAD_SIZE];
    let mut packet = MutableEchoRequestPacket::new(&mut icmp_buf)
        .ok_or_else(|| anyhow!("Failed to create ICMP packet"))?;

    packet.set_icmp_type(IcmpTypes::EchoRequest);
    packet.set_icmp_code(IcmpCode(0));
    packet.set_identifier(identifier);
    packet.set_sequence_number(sequence);

    let mut payload = [0u8; ICMP_ECHO_PAYLOAD_SIZE];
    let marker = (u32::from(identifier) << 16) | u32::from(sequence);
    payload[..4].copy_from_slice(&marker.to_be_bytes());
    packet.set_payload(&payload);

    let checksum = pnet_checksum(packet.packet(), 1);
    packet.set_checksum(checksum);

    Ok(icmp_buf)
}

//! Name the local host announces in `EHLO`.

use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

/// Used when no identity can be determined.
pub const FALLBACK_HELO: &str = "localhost";

pub trait LocalIdentity {
    fn local_name(&self) -> io::Result<String>;
}

/// A fixed, configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub String);

impl LocalIdentity for StaticIdentity {
    fn local_name(&self) -> io::Result<String> {
        let name = self.0.trim();
        if name.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty identity",
            ));
        }
        Ok(name.to_string())
    }
}

/// The local address the kernel would route public traffic from, written as
/// an SMTP address literal. Connecting a UDP socket sends no packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundAddress {
    pub route_probe: SocketAddr,
}

impl Default for OutboundAddress {
    fn default() -> Self {
        Self {
            route_probe: SocketAddr::from(([192, 0, 2, 1], 25)),
        }
    }
}

impl LocalIdentity for OutboundAddress {
    fn local_name(&self) -> io::Result<String> {
        let bind: SocketAddr = if self.route_probe.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)?;
        socket.connect(self.route_probe)?;
        address_literal(socket.local_addr()?.ip())
    }
}

fn address_literal(ip: IpAddr) -> io::Result<String> {
    if ip.is_unspecified() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no routable local address",
        ));
    }
    Ok(match ip {
        IpAddr::V4(v4) => format!("[{v4}]"),
        IpAddr::V6(v6) => format!("[IPv6:{v6}]"),
    })
}

/// Resolve the `EHLO` name, degrading to [`FALLBACK_HELO`].
pub fn helo_name(identity: &dyn LocalIdentity) -> String {
    match identity.local_name() {
        Ok(name) => name,
        Err(err) => {
            tracing::debug!(error = %err, "local identity unavailable, using fallback");
            FALLBACK_HELO.to_string()
        }
    }
}

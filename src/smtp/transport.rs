use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use native_tls::{HandshakeError, MidHandshakeTlsStream, TlsConnector, TlsStream};

use super::error::SessionError;

/// Byte stream a session speaks SMTP over, plaintext or encrypted.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Wraps a plaintext socket in TLS after a successful `STARTTLS`.
///
/// The session keeps its own handle to the socket, so a failed upgrade
/// leaves the plaintext stream usable.
pub trait TlsUpgrader: Send + Sync {
    fn upgrade(&self, host: &str, stream: TcpStream) -> Result<Box<dyn Transport>, SessionError>;
}

/// `native-tls` backed upgrader. Certificates are not verified: MX hosts
/// routinely present mismatched or self-signed certificates and encryption
/// here is opportunistic.
pub struct NativeTlsUpgrader {
    connector: TlsConnector,
    timeout: Option<Duration>,
}

impl NativeTlsUpgrader {
    pub fn new(timeout: Option<Duration>) -> Result<Self, SessionError> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(SessionError::handshake)?;
        Ok(Self { connector, timeout })
    }
}

impl TlsUpgrader for NativeTlsUpgrader {
    fn upgrade(&self, host: &str, stream: TcpStream) -> Result<Box<dyn Transport>, SessionError> {
        stream
            .set_read_timeout(self.timeout)
            .map_err(SessionError::handshake)?;
        stream
            .set_write_timeout(self.timeout)
            .map_err(SessionError::handshake)?;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let tls = match self.connector.connect(host, stream) {
            Ok(tls) => tls,
            Err(HandshakeError::Failure(err)) => return Err(SessionError::handshake(err)),
            Err(HandshakeError::WouldBlock(mid)) => complete_handshake(mid, deadline)?,
        };
        Ok(Box::new(tls))
    }
}

/// On a blocking socket `WouldBlock` means a read or write deadline expired.
/// Retry only while the overall deadline has not passed.
fn complete_handshake(
    mut mid: MidHandshakeTlsStream<TcpStream>,
    deadline: Option<Instant>,
) -> Result<TlsStream<TcpStream>, SessionError> {
    loop {
        if deadline.is_none_or(|deadline| Instant::now() >= deadline) {
            return Err(SessionError::handshake("TLS handshake timed out"));
        }
        match mid.handshake() {
            Ok(tls) => return Ok(tls),
            Err(HandshakeError::Failure(err)) => return Err(SessionError::handshake(err)),
            Err(HandshakeError::WouldBlock(next)) => mid = next,
        }
    }
}

use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::error::SessionError;
use super::reply::{ReplyLines, read_line};
use super::trace::{SessionTrace, TraceStep};
use super::transport::{TlsUpgrader, Transport};

/// Progress of a session through the probe dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    BannerRead,
    GreetingSent,
    UpgradeNegotiated,
    SenderSubmitted,
    RecipientProbed,
    Closed,
}

/// Everything one probe needs to know about its peer and envelope.
#[derive(Debug, Clone)]
pub struct SessionParams<'a> {
    pub host: &'a str,
    pub port: u16,
    pub helo: &'a str,
    pub sender: &'a str,
    pub recipient: &'a str,
    pub connect_timeout: Option<Duration>,
    pub command_timeout: Option<Duration>,
}

/// Outcome of one finished session. Tagged with the probed address so
/// concurrent results can be matched back to their origin.
#[derive(Debug)]
pub struct ProbeResult {
    pub probed_address: String,
    pub trace: SessionTrace,
    pub terminal_error: Option<SessionError>,
}

impl ProbeResult {
    pub fn recipient_reply(&self) -> Option<&str> {
        self.trace.get(TraceStep::EnvelopeRecipient)
    }
}

/// Reply to `EHLO`: whether `STARTTLS` was advertised, and the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub starttls: bool,
    pub text: String,
}

pub struct SmtpSession {
    host: String,
    plain: TcpStream,
    reader: BufReader<Box<dyn Transport>>,
    trace: SessionTrace,
    state: SessionState,
}

impl SmtpSession {
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Option<Duration>,
        command_timeout: Option<Duration>,
    ) -> io::Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        let mut last_err = None;
        for addr in &addrs {
            let attempt = match connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(command_timeout)?;
                    stream.set_write_timeout(command_timeout)?;
                    let transport: Box<dyn Transport> = Box::new(stream.try_clone()?);
                    debug!(host, %addr, "connected");
                    return Ok(Self {
                        host: host.to_string(),
                        plain: stream,
                        reader: BufReader::new(transport),
                        trace: SessionTrace::new(),
                        state: SessionState::Connecting,
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        }))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn trace(&self) -> &SessionTrace {
        &self.trace
    }

    pub fn record(&mut self, step: TraceStep, outcome: impl Into<String>) {
        self.trace.record(step, outcome);
    }

    fn advance(&mut self, next: SessionState) {
        trace!(host = %self.host, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Read the server banner. Failures yield an empty banner.
    pub fn read_banner(&mut self) -> String {
        let banner = match read_line(&mut self.reader) {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) => String::new(),
            Err(err) => {
                debug!(host = %self.host, error = %err, "banner read failed");
                String::new()
            }
        };
        self.advance(SessionState::BannerRead);
        banner
    }

    pub fn send(&mut self, command: &str) -> io::Result<()> {
        debug!(host = %self.host, "C: {command}");
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        let stream = self.reader.get_mut();
        stream.write_all(&line)?;
        stream.flush()
    }

    /// Send `command` and read a single reply line, trimmed. Empty when the
    /// peer said nothing.
    pub fn command_line(&mut self, command: &str) -> String {
        if let Err(err) = self.send(command) {
            debug!(host = %self.host, error = %err, "write failed");
        }
        let reply = match read_line(&mut self.reader) {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) => String::new(),
            Err(err) => {
                debug!(host = %self.host, error = %err, "read failed");
                String::new()
            }
        };
        debug!(host = %self.host, "S: {reply}");
        reply
    }

    /// Send `command` and read its full multi-line reply.
    pub fn command_reply(&mut self, command: &str) -> io::Result<ReplyLines> {
        self.send(command)?;
        let reply = ReplyLines::read(&mut self.reader);
        debug!(host = %self.host, "S: {}", reply.text());
        Ok(reply)
    }

    /// `EHLO` step. Does not touch the trace; the caller records it.
    pub fn greet(&mut self, helo: &str) -> io::Result<Greeting> {
        let reply = self.command_reply(&format!("EHLO {helo}"))?;
        self.advance(SessionState::GreetingSent);
        Ok(Greeting {
            starttls: reply.contains_ignore_case("STARTTLS"),
            text: reply.text(),
        })
    }

    /// Replace the transport with an encrypted one. On error the plaintext
    /// transport stays in place.
    pub fn upgrade(&mut self, upgrader: &dyn TlsUpgrader) -> Result<(), SessionError> {
        let stream = self.plain.try_clone().map_err(SessionError::handshake)?;
        let tls = upgrader.upgrade(&self.host, stream)?;
        self.reader = BufReader::new(tls);
        self.advance(SessionState::UpgradeNegotiated);
        Ok(())
    }

    /// Best effort; the reply is not awaited.
    pub fn quit(&mut self) {
        if let Err(err) = self.send("QUIT") {
            debug!(host = %self.host, error = %err, "QUIT not delivered");
        }
    }

    fn close(mut self) -> SessionTrace {
        self.advance(SessionState::Closed);
        std::mem::take(&mut self.trace)
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        let _ = self.plain.shutdown(Shutdown::Both);
    }
}

/// Drive one full probe dialogue against `params.host`.
///
/// The connection is closed on every path before this returns.
pub fn run_session(params: &SessionParams<'_>, upgrader: Option<&dyn TlsUpgrader>) -> ProbeResult {
    let mut session = match SmtpSession::connect(
        params.host,
        params.port,
        params.connect_timeout,
        params.command_timeout,
    ) {
        Ok(session) => session,
        Err(err) => {
            let err = SessionError::connection(params.host, err);
            let mut trace = SessionTrace::new();
            trace.record(TraceStep::Connection, format!("connection error: {err}"));
            return ProbeResult {
                probed_address: params.recipient.to_string(),
                trace,
                terminal_error: Some(err),
            };
        }
    };
    session.record(TraceStep::Connection, "connected successfully");

    let banner = session.read_banner();
    session.record(TraceStep::Banner, banner);

    let starttls = record_greeting(&mut session, params.helo, TraceStep::Capabilities);

    if starttls {
        if let Some(upgrader) = upgrader {
            negotiate_tls(&mut session, upgrader, params.helo);
        }
    }

    let terminal_error = submit_envelope(&mut session, params);
    session.quit();

    ProbeResult {
        probed_address: params.recipient.to_string(),
        trace: session.close(),
        terminal_error,
    }
}

fn record_greeting(session: &mut SmtpSession, helo: &str, step: TraceStep) -> bool {
    match session.greet(helo) {
        Ok(greeting) => {
            let note = if greeting.starttls {
                "STARTTLS supported"
            } else {
                "STARTTLS NOT supported"
            };
            session.record(step, note);
            greeting.starttls
        }
        Err(err) => {
            session.record(step, format!("EHLO error: {err}"));
            false
        }
    }
}

fn negotiate_tls(session: &mut SmtpSession, upgrader: &dyn TlsUpgrader, helo: &str) {
    let reply = session.command_line("STARTTLS");
    if !reply.starts_with("220") {
        let err = SessionError::EncryptionUnavailable { reply };
        warn!(error = %err, "continuing without TLS");
        session.record(TraceStep::Upgrade, err.to_string());
        return;
    }
    session.record(TraceStep::Upgrade, reply);

    match session.upgrade(upgrader) {
        Ok(()) => {
            session.record(TraceStep::TlsHandshake, "TLS handshake successful");
            record_greeting(session, helo, TraceStep::CapabilitiesTls);
        }
        Err(err) => {
            warn!(error = %err, "TLS handshake failed, continuing with plain connection");
            session.record(
                TraceStep::TlsHandshake,
                format!("{err}; continuing with plain connection"),
            );
        }
    }
}

fn submit_envelope(session: &mut SmtpSession, params: &SessionParams<'_>) -> Option<SessionError> {
    let reply = session.command_line(&format!("MAIL FROM:<{}>", params.sender));
    if !reply.starts_with("250") {
        session.record(
            TraceStep::EnvelopeSender,
            format!("MAIL FROM rejected: {reply}"),
        );
        return Some(SessionError::SenderRejected { reply });
    }
    session.record(TraceStep::EnvelopeSender, "MAIL FROM accepted");
    session.advance(SessionState::SenderSubmitted);

    let rcpt = match session.command_reply(&format!("RCPT TO:<{}>", params.recipient)) {
        Ok(reply) => reply.text(),
        Err(err) => {
            debug!(error = %err, "RCPT TO not delivered");
            String::new()
        }
    };
    session.record(TraceStep::EnvelopeRecipient, rcpt);
    session.advance(SessionState::RecipientProbed);
    None
}


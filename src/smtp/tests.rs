use std::net::TcpStream;
use std::time::{Duration, Instant};

use super::*;
use crate::test_support::{MockServer, accepting, closed_port};

const BANNER: &str = "220 mock.smtp.test ESMTP\r\n";

fn params(port: u16, recipient: &str) -> SessionParams<'_> {
    SessionParams {
        host: "127.0.0.1",
        port,
        helo: "probe.local",
        sender: "postmaster@probe.local",
        recipient,
        connect_timeout: Some(Duration::from_secs(2)),
        command_timeout: Some(Duration::from_secs(2)),
    }
}

struct FailingUpgrader;

impl TlsUpgrader for FailingUpgrader {
    fn upgrade(&self, _host: &str, _stream: TcpStream) -> Result<Box<dyn Transport>, SessionError> {
        Err(SessionError::EncryptionHandshake {
            message: "simulated handshake failure".to_string(),
        })
    }
}

/// Pretends the handshake worked and keeps talking over the same socket.
struct PassthroughUpgrader;

impl TlsUpgrader for PassthroughUpgrader {
    fn upgrade(&self, _host: &str, stream: TcpStream) -> Result<Box<dyn Transport>, SessionError> {
        Ok(Box::new(stream))
    }
}

fn starttls_server(command: &str) -> Option<String> {
    let upper = command.to_ascii_uppercase();
    if upper.starts_with("EHLO") {
        Some("250-mock.smtp.test\r\n250-AUTH PLAIN\r\n250 STARTTLS\r\n".to_string())
    } else if upper == "STARTTLS" {
        Some("220 2.0.0 Ready to start TLS\r\n".to_string())
    } else {
        accepting(command)
    }
}

#[test]
fn completes_dialogue_and_records_trace_in_order() {
    let server = MockServer::spawn(1, BANNER, accepting);
    let result = run_session(&params(server.port, "user@example.com"), None);

    assert!(result.terminal_error.is_none(), "{:?}", result.terminal_error);
    assert_eq!(result.probed_address, "user@example.com");
    let steps: Vec<_> = result.trace.iter().map(|(step, _)| step).collect();
    assert_eq!(
        steps,
        vec![
            TraceStep::Connection,
            TraceStep::Banner,
            TraceStep::Capabilities,
            TraceStep::EnvelopeSender,
            TraceStep::EnvelopeRecipient,
        ]
    );
    assert_eq!(
        result.trace.get(TraceStep::Banner),
        Some("220 mock.smtp.test ESMTP")
    );
    assert_eq!(
        result.trace.get(TraceStep::Capabilities),
        Some("STARTTLS NOT supported")
    );
    assert_eq!(result.recipient_reply(), Some("250 2.1.5 Ok"));

    let commands = server.finish();
    assert_eq!(
        commands,
        vec![
            "EHLO probe.local",
            "MAIL FROM:<postmaster@probe.local>",
            "RCPT TO:<user@example.com>",
            "QUIT",
        ]
    );
}

#[test]
fn sender_rejection_skips_recipient_probe() {
    let server = MockServer::spawn(1, BANNER, |command| {
        if command.starts_with("MAIL FROM:") {
            Some("550 5.7.1 Sender denied\r\n".to_string())
        } else {
            accepting(command)
        }
    });
    let result = run_session(&params(server.port, "user@example.com"), None);

    match &result.terminal_error {
        Some(SessionError::SenderRejected { reply }) => {
            assert_eq!(reply, "550 5.7.1 Sender denied")
        }
        other => panic!("expected sender rejection, got {other:?}"),
    }
    assert_eq!(
        result.trace.get(TraceStep::EnvelopeSender),
        Some("MAIL FROM rejected: 550 5.7.1 Sender denied")
    );
    assert!(!result.trace.contains(TraceStep::EnvelopeRecipient));

    let commands = server.finish();
    assert!(commands.iter().all(|c| !c.starts_with("RCPT")));
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn connection_failure_is_terminal() {
    let result = run_session(&params(closed_port(), "user@example.com"), None);

    assert!(matches!(
        result.terminal_error,
        Some(SessionError::Connection { .. })
    ));
    assert_eq!(result.trace.len(), 1);
    assert!(
        result
            .trace
            .get(TraceStep::Connection)
            .is_some_and(|text| text.starts_with("connection error:"))
    );
}

#[test]
fn handshake_failure_falls_back_to_plaintext() {
    let server = MockServer::spawn(1, BANNER, starttls_server);
    let result = run_session(
        &params(server.port, "user@example.com"),
        Some(&FailingUpgrader),
    );

    assert!(result.terminal_error.is_none(), "{:?}", result.terminal_error);
    assert_eq!(
        result.trace.get(TraceStep::Capabilities),
        Some("STARTTLS supported")
    );
    assert_eq!(
        result.trace.get(TraceStep::Upgrade),
        Some("220 2.0.0 Ready to start TLS")
    );
    let handshake = result.trace.get(TraceStep::TlsHandshake).expect("handshake");
    assert!(handshake.contains("simulated handshake failure"));
    assert!(handshake.contains("continuing with plain connection"));
    assert!(!result.trace.contains(TraceStep::CapabilitiesTls));
    assert_eq!(
        result.trace.get(TraceStep::EnvelopeSender),
        Some("MAIL FROM accepted")
    );
    assert_eq!(result.recipient_reply(), Some("250 2.1.5 Ok"));

    let commands = server.finish();
    assert_eq!(commands.iter().filter(|c| c.starts_with("EHLO")).count(), 1);
}

#[test]
fn refused_starttls_continues_in_plaintext() {
    let server = MockServer::spawn(1, BANNER, |command| {
        if command == "STARTTLS" {
            Some("454 4.7.0 TLS not available\r\n".to_string())
        } else {
            starttls_server(command)
        }
    });
    let result = run_session(
        &params(server.port, "user@example.com"),
        Some(&FailingUpgrader),
    );

    assert!(result.terminal_error.is_none());
    assert_eq!(
        result.trace.get(TraceStep::Upgrade),
        Some("STARTTLS failed: 454 4.7.0 TLS not available")
    );
    assert!(!result.trace.contains(TraceStep::TlsHandshake));
    assert_eq!(result.recipient_reply(), Some("250 2.1.5 Ok"));
    server.finish();
}

#[test]
fn successful_upgrade_greets_again() {
    let server = MockServer::spawn(1, BANNER, starttls_server);
    let result = run_session(
        &params(server.port, "user@example.com"),
        Some(&PassthroughUpgrader),
    );

    assert!(result.terminal_error.is_none());
    assert_eq!(
        result.trace.get(TraceStep::TlsHandshake),
        Some("TLS handshake successful")
    );
    assert_eq!(
        result.trace.get(TraceStep::CapabilitiesTls),
        Some("STARTTLS supported")
    );

    let commands = server.finish();
    assert_eq!(
        commands,
        vec![
            "EHLO probe.local",
            "STARTTLS",
            "EHLO probe.local",
            "MAIL FROM:<postmaster@probe.local>",
            "RCPT TO:<user@example.com>",
            "QUIT",
        ]
    );
}

#[test]
fn upgrade_skipped_without_upgrader() {
    let server = MockServer::spawn(1, BANNER, starttls_server);
    let result = run_session(&params(server.port, "user@example.com"), None);

    assert!(!result.trace.contains(TraceStep::Upgrade));
    let commands = server.finish();
    assert!(!commands.iter().any(|c| c == "STARTTLS"));
}

#[test]
fn multiline_recipient_reply_is_kept_whole() {
    let server = MockServer::spawn(1, BANNER, |command| {
        if command.starts_with("RCPT TO:") {
            Some("550-5.1.1 The email account does not exist.\r\n550 5.1.1 Try again.\r\n".to_string())
        } else {
            accepting(command)
        }
    });
    let result = run_session(&params(server.port, "ghost@example.com"), None);

    assert!(result.terminal_error.is_none());
    assert_eq!(
        result.recipient_reply(),
        Some("550-5.1.1 The email account does not exist.\n550 5.1.1 Try again.")
    );
    assert_eq!(reply_code(result.recipient_reply().unwrap_or_default()).ok(), Some(550));
    server.finish();
}

#[test]
fn silent_banner_is_tolerated() {
    let server = MockServer::spawn(1, "", accepting);
    let mut quick = params(server.port, "user@example.com");
    quick.command_timeout = Some(Duration::from_millis(300));
    let result = run_session(&quick, None);

    assert_eq!(result.trace.get(TraceStep::Banner), Some(""));
    assert!(result.terminal_error.is_none());
    assert_eq!(result.recipient_reply(), Some("250 2.1.5 Ok"));
    server.finish();
}

#[test]
fn session_state_advances_through_greeting() {
    let server = MockServer::spawn(1, BANNER, accepting);
    let mut session = SmtpSession::connect(
        "127.0.0.1",
        server.port,
        Some(Duration::from_secs(2)),
        Some(Duration::from_secs(2)),
    )
    .expect("connect");
    assert_eq!(session.state(), SessionState::Connecting);
    session.read_banner();
    assert_eq!(session.state(), SessionState::BannerRead);
    let greeting = session.greet("probe.local").expect("greet");
    assert_eq!(session.state(), SessionState::GreetingSent);
    assert!(!greeting.starttls);
    assert_eq!(greeting.text, "250-mock.smtp.test\n250 SIZE 1000000");
    session.quit();
    drop(session);
    server.finish();
}

#[test]
fn silent_peer_after_starttls_bounds_the_handshake() {
    let server = MockServer::spawn(1, BANNER, starttls_server);
    let timeout = Duration::from_millis(300);
    let mut quick = params(server.port, "user@example.com");
    quick.command_timeout = Some(timeout);
    let upgrader = NativeTlsUpgrader::new(Some(timeout)).expect("tls connector");

    let started = Instant::now();
    let result = run_session(&quick, Some(&upgrader));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "session took {:?}",
        started.elapsed()
    );

    assert_eq!(
        result.trace.get(TraceStep::Upgrade),
        Some("220 2.0.0 Ready to start TLS")
    );
    let handshake = result.trace.get(TraceStep::TlsHandshake).expect("handshake");
    assert!(handshake.starts_with("TLS handshake error:"), "{handshake}");
    assert!(handshake.ends_with("continuing with plain connection"));
    assert!(!result.trace.contains(TraceStep::CapabilitiesTls));
    assert!(result.trace.contains(TraceStep::EnvelopeSender));
    server.finish();
}

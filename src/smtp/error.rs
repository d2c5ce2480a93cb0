use thiserror::Error;

/// Anomalies a probe session can run into.
///
/// Only [`SessionError::Connection`] and [`SessionError::SenderRejected`]
/// end a session early; the others are recorded in the trace and the
/// dialogue carries on.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection to {host} failed: {source}")]
    Connection {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MAIL FROM rejected")]
    SenderRejected { reply: String },
    #[error("STARTTLS failed: {reply}")]
    EncryptionUnavailable { reply: String },
    #[error("TLS handshake error: {message}")]
    EncryptionHandshake { message: String },
    #[error("unparseable SMTP reply: '{line}'")]
    UnparseableReply { line: String },
}

impl SessionError {
    pub(crate) fn connection(host: &str, source: std::io::Error) -> Self {
        Self::Connection {
            host: host.to_string(),
            source,
        }
    }

    pub(crate) fn handshake<T: std::fmt::Display>(err: T) -> Self {
        Self::EncryptionHandshake {
            message: err.to_string(),
        }
    }

    /// Whether this error ends the session before the recipient probe.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::SenderRejected { .. })
    }
}

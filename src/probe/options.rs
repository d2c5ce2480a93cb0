use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Configuration knobs for [`Prober`](crate::probe::Prober).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub helo_domain: Option<String>,
    pub envelope_sender: Option<String>,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub starttls: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: None,
            envelope_sender: None,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            starttls: true,
        }
    }
}

impl ProbeOptions {
    /// A zero duration disables the connect deadline.
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero(self.connect_timeout)
    }

    /// A zero duration disables the per-command read/write deadline.
    pub fn command_timeout(&self) -> Option<Duration> {
        non_zero(self.command_timeout)
    }

    /// Configured `EHLO` name, trimmed. Blank counts as unset.
    pub fn helo_domain(&self) -> Option<&str> {
        self.helo_domain
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Envelope sender for `MAIL FROM`. When unspecified a
    /// `postmaster@domain` placeholder is synthesised.
    pub fn envelope_sender(&self, ascii_domain: &str) -> String {
        self.envelope_sender
            .as_ref()
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("postmaster@{ascii_domain}"))
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    if duration.is_zero() {
        None
    } else {
        Some(duration)
    }
}

use std::fmt;

use crate::smtp::SessionTrace;

/// Final answer for one address, derived from the target and catch-all
/// probes.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status_text: String,
    pub deliverable: bool,
    /// The synthetic address was accepted as well: the exchanger looks like
    /// a catch-all and `deliverable` cannot be trusted.
    pub risky: bool,
    pub mx_host: String,
    pub trace: SessionTrace,
    pub recipient_code: Option<u16>,
    /// Terminal error of the target probe, if it ended early.
    pub error: Option<String>,
}

impl Verdict {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "error: {error}");
        }
        match self.recipient_code {
            Some(code) => write!(f, "{code} {}", self.status_text)?,
            None => f.write_str(&self.status_text)?,
        }
        if self.risky {
            f.write_str(" (catch-all)")?;
        }
        Ok(())
    }
}

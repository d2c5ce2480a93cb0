//! SMTP reply code classification.
//!
//! [`classify`] is total over `u16`: codes missing from the table resolve to
//! [`StatusClass::Unrecognized`] instead of failing.

use std::fmt;

use phf::phf_map;

/// The only code treated as a confirmed mailbox.
pub const DELIVERABLE_CODE: u16 = 250;

const UNRECOGNIZED_DESCRIPTION: &str = "Unknown or unsupported SMTP status code";

static STATUS_TABLE: phf::Map<u16, &'static str> = phf_map! {
    101u16 => "Server connection error (wrong server name or connection port)",
    211u16 => "System status (response to HELP)",
    214u16 => "Help message (response to HELP)",
    220u16 => "The server is ready (response to connection attempt)",
    221u16 => "The server closes the transmission channel",
    235u16 => "Authentication successful (response to AUTH)",
    250u16 => "Deliverable",
    251u16 => "User not local, but server will forward message",
    252u16 => "Server cannot verify user (message accepted for delivery)",
    334u16 => "Response to AUTH (security mechanism accepted)",
    354u16 => "Start mail input; end with <CRLF>.<CRLF>",
    421u16 => "Service not available, closing transmission channel",
    422u16 => "Recipient's mailbox exceeded storage limit",
    431u16 => "File overload (too many messages to a domain)",
    441u16 => "No response from recipient's server",
    442u16 => "Connection dropped",
    446u16 => "Internal loop detected",
    450u16 => "Mailbox unavailable (busy, greylisted or temporarily blocked)",
    451u16 => "Requested action aborted due to local error",
    452u16 => "Requested action not taken (insufficient system storage)",
    454u16 => "TLS not available due to temporary reason",
    455u16 => "Server cannot accommodate parameters",
    471u16 => "Local spam filter error",
    500u16 => "Syntax error, command unrecognized",
    501u16 => "Syntax error in parameters or arguments",
    502u16 => "Command not implemented",
    503u16 => "Bad sequence of commands",
    504u16 => "Command parameter not implemented",
    510u16 => "Invalid email address",
    512u16 => "DNS error (check recipient address)",
    521u16 => "Host does not accept mail",
    523u16 => "Total size of mailing exceeds recipient server limits",
    530u16 => "Authentication required (try STARTTLS)",
    535u16 => "Authentication failed",
    538u16 => "Encryption required for authentication mechanism",
    541u16 => "Message rejected by spam filter",
    550u16 => "Mailbox unavailable / not found / relay denied",
    551u16 => "User not local (forward path will be specified)",
    552u16 => "Mailbox full (action aborted)",
    553u16 => "Invalid or malformed email address",
    554u16 => "Transaction failed due to unknown error",
    555u16 => "MAIL FROM/RCPT TO parameters not recognized",
};

/// Broad category of a reply code.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Informational,
    Success,
    Intermediate,
    TransientFailure,
    PermanentFailure,
    Unrecognized,
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Informational => "informational",
            Self::Success => "success",
            Self::Intermediate => "intermediate",
            Self::TransientFailure => "transient failure",
            Self::PermanentFailure => "permanent failure",
            Self::Unrecognized => "unrecognized",
        })
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub code: u16,
    pub class: StatusClass,
    pub description: &'static str,
}

impl Classification {
    pub fn is_deliverable(&self) -> bool {
        is_deliverable(self.code)
    }
}

pub fn classify(code: u16) -> Classification {
    match STATUS_TABLE.get(&code) {
        Some(description) => Classification {
            code,
            class: class_of(code),
            description: *description,
        },
        None => Classification {
            code,
            class: StatusClass::Unrecognized,
            description: UNRECOGNIZED_DESCRIPTION,
        },
    }
}

/// Forwarding (251) and cannot-verify (252) acceptances are deliberately
/// not counted.
pub fn is_deliverable(code: u16) -> bool {
    code == DELIVERABLE_CODE
}

fn class_of(code: u16) -> StatusClass {
    match code / 100 {
        1 => StatusClass::Informational,
        2 => StatusClass::Success,
        3 => StatusClass::Intermediate,
        4 => StatusClass::TransientFailure,
        5 => StatusClass::PermanentFailure,
        _ => StatusClass::Unrecognized,
    }
}

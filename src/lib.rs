#![forbid(unsafe_code)]
//! SMTP deliverability probing with catch-all detection.
//!
//! The address is checked by talking SMTP to the domain's exchanger up to
//! `RCPT TO`, never sending a message. A second, synthetic address is probed
//! in parallel so that exchangers accepting everything are flagged as risky.

pub mod identity;
pub mod probe;
pub mod smtp;
pub mod status;

#[cfg(feature = "with-mx")]
pub mod mx;
#[cfg(feature = "with-mx")]
pub use mx::{Error as MxError, MxRecord, MxStatus, check_mx};

#[cfg(all(feature = "with-serde", feature = "with-mx"))]
pub mod service;
#[cfg(all(feature = "with-serde", feature = "with-mx"))]
pub use service::{CheckRequest, CheckResponse, RequestError, handle_request};

pub use identity::{LocalIdentity, OutboundAddress, StaticIdentity};
pub use probe::{ProbeOptions, Prober, Verdict};
pub use smtp::{ProbeResult, SessionError, SessionTrace, TraceStep};
pub use status::{Classification, StatusClass, classify, is_deliverable};

#[cfg(test)]
mod test_support;

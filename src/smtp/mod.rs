//! Client side of the SMTP probe dialogue.
//!
//! [`run_session`] drives one connection through banner, `EHLO`, optional
//! `STARTTLS`, `MAIL FROM` and `RCPT TO`, and hands back a [`ProbeResult`]
//! carrying the step-by-step [`SessionTrace`].

mod error;
mod reply;
mod session;
mod trace;
mod transport;

pub use error::SessionError;
pub use reply::{Reply, ReplyLines, is_continuation, reply_code};
pub use session::{
    Greeting, ProbeResult, SessionParams, SessionState, SmtpSession, run_session,
};
pub use trace::{SessionTrace, TraceStep};
pub use transport::{NativeTlsUpgrader, TlsUpgrader, Transport};

#[cfg(test)]
mod tests;

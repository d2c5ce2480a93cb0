//! Dual-probe orchestration.
//!
//! [`Prober::probe`] runs two SMTP sessions side by side against the same
//! exchanger: one for the address under test, one for a synthetic address at
//! the same domain. Acceptance of both is the signature of a catch-all
//! exchanger and marks the verdict as risky.

mod options;
mod types;
mod util;

pub use options::ProbeOptions;
pub use types::Verdict;
pub use util::{random_local_part, synthetic_address};

use std::sync::mpsc;
use std::thread;

use tracing::info;

use crate::identity::{LocalIdentity, OutboundAddress, helo_name};
use crate::smtp::{
    NativeTlsUpgrader, ProbeResult, SessionError, SessionParams, SessionTrace, TlsUpgrader,
    reply_code, run_session,
};
use crate::status::{DELIVERABLE_CODE, classify, is_deliverable};

pub const UNREADABLE_STATUS: &str = "Not readable status.";

pub struct Prober {
    options: ProbeOptions,
    helo: String,
    upgrader: Option<Box<dyn TlsUpgrader>>,
}

impl Prober {
    /// Prober announcing the host's outbound address in `EHLO` unless a
    /// name is configured.
    pub fn new(options: ProbeOptions) -> Result<Self, SessionError> {
        Self::with_identity(options, &OutboundAddress::default())
    }

    pub fn with_identity(
        options: ProbeOptions,
        identity: &dyn LocalIdentity,
    ) -> Result<Self, SessionError> {
        let helo = options
            .helo_domain()
            .map(str::to_string)
            .unwrap_or_else(|| helo_name(identity));
        let upgrader: Option<Box<dyn TlsUpgrader>> = if options.starttls {
            Some(Box::new(NativeTlsUpgrader::new(options.command_timeout())?))
        } else {
            None
        };
        Ok(Self {
            options,
            helo,
            upgrader,
        })
    }

    /// Replace the TLS upgrader; `None` disables `STARTTLS`.
    pub fn with_upgrader(mut self, upgrader: Option<Box<dyn TlsUpgrader>>) -> Self {
        self.upgrader = upgrader;
        self
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    pub fn helo(&self) -> &str {
        &self.helo
    }

    /// Probe `target` and a synthetic sibling concurrently and combine the
    /// two outcomes. Returns once both sessions have finished.
    pub fn probe(&self, mx_host: &str, sender: &str, target: &str, domain: &str) -> Verdict {
        let synthetic = synthetic_address(target, domain);
        let results = self.run_pair(mx_host, sender, &[target, synthetic.as_str()]);
        let (target_result, synthetic_result) = pair_results(target, results);
        let verdict = build_verdict(mx_host, target_result, synthetic_result);
        info!(
            mx_host,
            target,
            deliverable = verdict.deliverable,
            risky = verdict.risky,
            status = %verdict.status_text,
            "probe finished"
        );
        verdict
    }

    fn run_pair(&self, mx_host: &str, sender: &str, recipients: &[&str]) -> Vec<ProbeResult> {
        let (tx, rx) = mpsc::sync_channel::<ProbeResult>(recipients.len());
        let upgrader = self.upgrader.as_deref();
        thread::scope(|scope| {
            for &recipient in recipients {
                let tx = tx.clone();
                let params = SessionParams {
                    host: mx_host,
                    port: self.options.port,
                    helo: &self.helo,
                    sender,
                    recipient,
                    connect_timeout: self.options.connect_timeout(),
                    command_timeout: self.options.command_timeout(),
                };
                scope.spawn(move || {
                    let result = run_session(&params, upgrader);
                    tx.send(result).ok();
                });
            }
            drop(tx);
            rx.iter().take(recipients.len()).collect()
        })
    }
}

/// Split results into (target, synthetic) by the address each one probed,
/// whatever order they arrived in.
pub(crate) fn pair_results(
    target: &str,
    results: Vec<ProbeResult>,
) -> (Option<ProbeResult>, Option<ProbeResult>) {
    let mut target_result = None;
    let mut synthetic_result = None;
    for result in results {
        if target_result.is_none() && result.probed_address == target {
            target_result = Some(result);
        } else {
            synthetic_result = Some(result);
        }
    }
    (target_result, synthetic_result)
}

fn recipient_code(result: &ProbeResult) -> Option<u16> {
    if result.terminal_error.as_ref().is_some_and(SessionError::is_terminal) {
        return None;
    }
    result
        .recipient_reply()
        .and_then(|text| reply_code(text).ok())
}

pub(crate) fn build_verdict(
    mx_host: &str,
    target: Option<ProbeResult>,
    synthetic: Option<ProbeResult>,
) -> Verdict {
    let Some(target) = target else {
        return Verdict {
            status_text: UNREADABLE_STATUS.to_string(),
            deliverable: false,
            risky: false,
            mx_host: mx_host.to_string(),
            trace: SessionTrace::new(),
            recipient_code: None,
            error: Some("probe did not complete".to_string()),
        };
    };

    if let Some(err) = target.terminal_error.as_ref().filter(|err| err.is_terminal()) {
        return Verdict {
            status_text: err.to_string(),
            deliverable: false,
            risky: false,
            mx_host: mx_host.to_string(),
            recipient_code: None,
            error: Some(err.to_string()),
            trace: target.trace,
        };
    }

    let code = recipient_code(&target);
    let (status_text, deliverable) = match code {
        Some(code) => (classify(code).description.to_string(), is_deliverable(code)),
        None => (UNREADABLE_STATUS.to_string(), false),
    };
    let catch_all = synthetic
        .as_ref()
        .and_then(recipient_code)
        .is_some_and(|code| code == DELIVERABLE_CODE);

    Verdict {
        status_text,
        deliverable,
        risky: deliverable && catch_all,
        mx_host: mx_host.to_string(),
        trace: target.trace,
        recipient_code: code,
        error: None,
    }
}

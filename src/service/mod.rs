//! Request/response shaping around the probe (`with-serde` + `with-mx`).
//!
//! Accepts `{"email": "..."}`, validates the address, resolves the preferred
//! exchanger, runs [`Prober::probe`] and renders a [`CheckResponse`].

mod error;
mod types;

pub use error::RequestError;
pub use types::{CheckRequest, CheckResponse, ValidatedRequest};

use serde_json::Value;
use trust_dns_resolver::Resolver;

use crate::mx::{self, LookupMx, preferred_exchange};
use crate::probe::Prober;

/// Parse a JSON request body. A missing or non-string `email` field is an
/// invalid email, not invalid JSON.
pub fn parse_request(body: &str) -> Result<CheckRequest, RequestError> {
    let value: Value =
        serde_json::from_str(body).map_err(|source| RequestError::InvalidJson { source })?;
    let email = value
        .get("email")
        .and_then(Value::as_str)
        .ok_or(RequestError::InvalidEmail)?;
    Ok(CheckRequest {
        email: email.trim().to_string(),
    })
}

impl CheckRequest {
    pub fn validate(&self) -> Result<ValidatedRequest, RequestError> {
        let email = self.email.trim();
        let (local, domain) = email.split_once('@').ok_or(RequestError::InvalidEmail)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(RequestError::InvalidEmail);
        }
        let ascii_domain = mx::normalize_domain(domain)?;
        Ok(ValidatedRequest {
            email: format!("{local}@{ascii_domain}"),
            ascii_domain,
        })
    }
}

/// Run a validated check against `resolver`.
pub fn check_with_resolver<R>(
    request: &CheckRequest,
    resolver: &R,
    prober: &Prober,
) -> Result<CheckResponse, RequestError>
where
    R: LookupMx + ?Sized,
{
    let valid = request.validate()?;
    let mx_host = preferred_exchange(resolver, &valid.ascii_domain)?;
    let sender = prober.options().envelope_sender(&valid.ascii_domain);
    let verdict = prober.probe(&mx_host, &sender, &valid.email, &valid.ascii_domain);
    Ok(CheckResponse::from_verdict(verdict))
}

/// Full request cycle: body in, response out. Never fails; refusals are
/// rendered as [`CheckResponse::Refused`].
pub fn handle_request<R>(body: &str, resolver: &R, prober: &Prober) -> CheckResponse
where
    R: LookupMx + ?Sized,
{
    match parse_request(body).and_then(|request| check_with_resolver(&request, resolver, prober)) {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "request refused");
            CheckResponse::refused(&err)
        }
    }
}

/// [`check_with_resolver`] using the system DNS configuration.
pub fn check(request: &CheckRequest, prober: &Prober) -> Result<CheckResponse, RequestError> {
    let resolver = Resolver::from_system_conf()
        .map_err(|err| RequestError::from(mx::Error::resolver_init(err)))?;
    check_with_resolver(request, &resolver, prober)
}

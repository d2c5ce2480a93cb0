use serde::{Deserialize, Serialize};

use crate::probe::Verdict;
use crate::smtp::SessionTrace;

use super::error::RequestError;

/// Body of a check request: `{"email": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub email: String,
}

/// A request that passed validation: one `@`, both sides non-empty, domain
/// converted to ASCII.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub email: String,
    pub ascii_domain: String,
}

/// JSON reply of a check, in the shape HTTP clients of the service expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CheckResponse {
    Checked {
        status: String,
        mx_host: String,
        logs: SessionTrace,
        #[serde(rename = "isDeliverable")]
        is_deliverable: bool,
        risky: bool,
        #[serde(rename = "errorStatus")]
        error_status: bool,
    },
    ProbeFailed {
        status: String,
        mx_host: String,
        logs: SessionTrace,
        #[serde(rename = "errorStatus")]
        error_status: bool,
    },
    Refused {
        error: String,
        #[serde(rename = "errorStatus")]
        error_status: bool,
    },
}

impl CheckResponse {
    pub fn from_verdict(verdict: Verdict) -> Self {
        if verdict.is_error() {
            Self::ProbeFailed {
                status: verdict.status_text,
                mx_host: verdict.mx_host,
                logs: verdict.trace,
                error_status: true,
            }
        } else {
            Self::Checked {
                status: verdict.status_text,
                mx_host: verdict.mx_host,
                logs: verdict.trace,
                is_deliverable: verdict.deliverable,
                risky: verdict.risky,
                error_status: false,
            }
        }
    }

    pub fn refused(err: &RequestError) -> Self {
        Self::Refused {
            error: err.to_string(),
            error_status: true,
        }
    }

    /// Status code an HTTP front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Checked { .. } => 200,
            Self::ProbeFailed { .. } | Self::Refused { .. } => 400,
        }
    }

    pub fn is_deliverable(&self) -> bool {
        matches!(
            self,
            Self::Checked {
                is_deliverable: true,
                ..
            }
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

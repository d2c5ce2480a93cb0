use thiserror::Error;

use crate::mx::Error as MxError;

/// Reasons a check request is refused before any probe runs.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid JSON")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid email")]
    InvalidEmail,
    #[error("No MX records found")]
    NoMxRecords {
        #[source]
        source: MxError,
    },
}

impl From<MxError> for RequestError {
    fn from(source: MxError) -> Self {
        match source {
            MxError::EmptyDomain | MxError::IdnaConversion { .. } => Self::InvalidEmail,
            other => Self::NoMxRecords { source: other },
        }
    }
}

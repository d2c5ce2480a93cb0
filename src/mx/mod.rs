//! DNS MX resolution (`with-mx` feature).
//!
//! [`check_mx`] performs a synchronous lookup using the system resolver and
//! returns a [`MxStatus`]; [`MxStatus::preferred`] picks the exchanger a
//! probe should talk to.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{LookupMx, check_mx, normalize_domain, preferred_exchange, resolve_with};
pub use types::{MxRecord, MxStatus};

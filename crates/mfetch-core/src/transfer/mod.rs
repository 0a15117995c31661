//! Per-transfer outcomes.
//!
//! Every URL ends in exactly one [`Outcome`]: the response body, or a
//! [`TransferError`] saying why the transfer failed. Failures are local to
//! their URL; they never stop the other transfers.

mod classify;
mod error;

pub use classify::{classify, classify_curl_error, FailureKind};
pub use error::TransferError;

/// Terminal result of one transfer.
pub type Outcome = Result<Vec<u8>, TransferError>;

//! Failure reason attached to a single URL's result entry.

use std::fmt;

/// Why one transfer failed. Recorded in-band in the result mapping; never
/// fatal to the rest of a multi-fetch.
#[derive(Debug)]
pub enum TransferError {
    /// libcurl reported a transport error (DNS, connect, timeout, protocol, I/O).
    Curl(curl::Error),
    /// Response status outside 2xx (only when `fail_on_http_error` is set).
    Http(u32),
    /// The worker running this transfer panicked before publishing a result.
    Panicked,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(code) => write!(f, "HTTP {}", code),
            TransferError::Panicked => write!(f, "transfer worker panicked"),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Curl(e) => Some(e),
            TransferError::Http(_) | TransferError::Panicked => None,
        }
    }
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        TransferError::Curl(e)
    }
}

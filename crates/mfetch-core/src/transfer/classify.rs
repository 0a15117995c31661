//! Map curl errors and HTTP statuses onto a small set of failure kinds.

use std::fmt;

use super::error::TransferError;

/// Coarse category of a transfer failure, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Host (or proxy) name could not be resolved.
    Dns,
    /// TCP/TLS connection could not be established.
    Connect,
    /// Connect or transfer timed out (including the low-speed abort).
    Timeout,
    /// Malformed URL, unsupported scheme, redirect loop, bad response framing.
    Protocol,
    /// Send/receive failed mid-transfer.
    Io,
    /// Non-2xx status with `fail_on_http_error` enabled.
    Http(u32),
    /// Anything else, including worker panics.
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Dns => write!(f, "dns"),
            FailureKind::Connect => write!(f, "connect"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Protocol => write!(f, "protocol"),
            FailureKind::Io => write!(f, "io"),
            FailureKind::Http(code) => write!(f, "http {}", code),
            FailureKind::Other => write!(f, "other"),
        }
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return FailureKind::Dns;
    }
    if e.is_operation_timedout() {
        return FailureKind::Timeout;
    }
    if e.is_couldnt_connect() || e.is_ssl_connect_error() {
        return FailureKind::Connect;
    }
    if e.is_unsupported_protocol()
        || e.is_url_malformed()
        || e.is_too_many_redirects()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_bad_content_encoding()
        || e.is_http2_error()
    {
        return FailureKind::Protocol;
    }
    if e.is_read_error() || e.is_recv_error() || e.is_send_error() || e.is_write_error() {
        return FailureKind::Io;
    }
    FailureKind::Other
}

/// Classify a transfer error.
pub fn classify(e: &TransferError) -> FailureKind {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http(code) => FailureKind::Http(*code),
        TransferError::Panicked => FailureKind::Other,
    }
}

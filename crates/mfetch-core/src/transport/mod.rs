//! Transport Unit: one HTTP GET into an in-memory buffer.
//!
//! The scheduler is generic over [`Transport`] so it can be driven by
//! libcurl ([`CurlTransport`]) or by anything else that can open a
//! per-transfer resource and run it to completion.

mod collector;
mod easy;

use std::time::Duration;

use crate::error::FetchError;
use crate::transfer::Outcome;

pub use collector::Collector;
pub use easy::{CurlTransport, CurlUnit};

/// Opens and runs transfers. Shared by reference across worker threads.
pub trait Transport: Sync {
    /// Resources owned by one in-flight transfer (handle + body buffer).
    /// Dropping it releases them.
    type Unit: Send;

    /// Create the resources for one transfer. Only allocation failures are
    /// errors here; a URL the transport cannot use becomes that transfer's
    /// failure outcome when it is performed.
    fn open(&self, url: &str) -> Result<Self::Unit, FetchError>;

    /// Run the transfer to completion. Consumes the unit, so its resources
    /// are released exactly once, when this returns.
    fn perform(&self, unit: Self::Unit) -> Outcome;
}

/// Per-handle libcurl settings.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Whole-transfer timeout; `None` relies on the low-speed abort only.
    pub timeout: Option<Duration>,
    pub max_redirections: u32,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// libcurl receive buffer size (None = library default).
    pub buffer_size: Option<usize>,
    /// Treat a non-2xx final status as a failure instead of returning its body.
    pub fail_on_http_error: bool,
    /// Bytes reserved up front for each body buffer.
    pub initial_body_capacity: usize,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: None,
            max_redirections: 10,
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            buffer_size: None,
            fail_on_http_error: false,
            initial_body_capacity: 16 * 1024,
        }
    }
}

//! Process-scoped transport initialization.
//!
//! libcurl needs one global init before the first handle is created and
//! must not be torn down while a transfer is running. A [`Session`] is the
//! explicit token for that: the host creates it once, every fetcher and
//! transport borrows it, so none can outlive it.

use crate::transport::{CurlOptions, CurlTransport};

#[derive(Debug)]
pub struct Session {
    curl_version: String,
}

impl Session {
    /// Initialize libcurl for this process. Calling it again is harmless;
    /// the underlying global init runs once.
    pub fn initialize() -> Session {
        curl::init();
        let curl_version = curl::Version::get().version().to_string();
        tracing::debug!(curl = %curl_version, "transport session initialized");
        Session { curl_version }
    }

    /// libcurl version string, e.g. "8.5.0".
    pub fn curl_version(&self) -> &str {
        &self.curl_version
    }

    /// Transport bound to this session.
    pub fn transport(&self, opts: CurlOptions) -> CurlTransport<'_> {
        CurlTransport::new(self, opts)
    }

    /// End of transport use. Consumes the session; the borrow checker has
    /// already ensured no fetcher still holds it.
    pub fn shutdown(self) {
        tracing::debug!("transport session shut down");
    }
}

//! Single-fetch path: exactly one URL, fetched on the calling thread with
//! no slot pool or scheduler.

use crate::error::FetchError;
use crate::transport::Transport;

/// Fetches one URL and returns its body. A transport failure is returned as
/// [`FetchError::Transfer`].
pub fn fetch_one<T: Transport>(transport: &T, url: &str) -> Result<Vec<u8>, FetchError> {
    let unit = transport.open(url)?;
    match transport.perform(unit) {
        Ok(body) => {
            tracing::debug!(url, bytes = body.len(), "single fetch ok");
            Ok(body)
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "single fetch failed");
            Err(FetchError::Transfer(e))
        }
    }
}

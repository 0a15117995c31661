//! Easy2 handler that accumulates the response body in memory.

/// Body buffer for one transfer. Implements curl's Handler for Easy2.
#[derive(Debug, Default)]
pub struct Collector {
    body: Vec<u8>,
}

impl Collector {
    /// Buffer with `capacity` bytes reserved. Fails if the reservation cannot be made.
    pub fn with_capacity(capacity: usize) -> Result<Self, std::collections::TryReserveError> {
        let mut body = Vec::new();
        body.try_reserve_exact(capacity)?;
        Ok(Self { body })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Hand the body over, leaving the collector empty.
    pub fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }
}

impl curl::easy::Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        // Short write makes libcurl fail the transfer with a write error.
        if self.body.try_reserve(data.len()).is_err() {
            tracing::warn!(len = data.len(), "body buffer could not grow");
            return Ok(0);
        }
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}

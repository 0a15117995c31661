//! In-memory transport for scheduler tests.
//!
//! URL forms: `fake://<ms>/<name>` sleeps `ms` then returns a body derived
//! from the URL; `dns://...` fails as an unresolvable host; `panic://...`
//! panics inside perform. Counts opened units, live units and peak
//! concurrent performs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::FetchError;
use crate::transfer::{Outcome, TransferError};
use crate::transport::Transport;

const COULDNT_RESOLVE_HOST: u32 = 6;
const UNSUPPORTED_PROTOCOL: u32 = 1;

pub(crate) struct FakeTransport {
    pub(crate) opened: AtomicUsize,
    pub(crate) peak: AtomicUsize,
    active: AtomicUsize,
    live: Arc<AtomicUsize>,
    fail_open_at: Option<usize>,
}

pub(crate) struct FakeUnit {
    url: String,
    live: Arc<AtomicUsize>,
}

impl Drop for FakeUnit {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            opened: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            fail_open_at: None,
        }
    }

    /// The `k`-th call to `open` (0-based) fails with an allocation error.
    pub(crate) fn fail_open_at(mut self, k: usize) -> Self {
        self.fail_open_at = Some(k);
        self
    }

    /// Units opened and not yet dropped.
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn body_for(url: &str) -> Vec<u8> {
        format!("body of {}", url).into_bytes()
    }
}

impl Transport for FakeTransport {
    type Unit = FakeUnit;

    fn open(&self, url: &str) -> Result<FakeUnit, FetchError> {
        let k = self.opened.fetch_add(1, Ordering::SeqCst);
        if Some(k) == self.fail_open_at {
            return Err(FetchError::Allocation { what: "fake unit" });
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeUnit {
            url: url.to_string(),
            live: Arc::clone(&self.live),
        })
    }

    fn perform(&self, unit: FakeUnit) -> Outcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let outcome = behave(&unit.url);
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn behave(url: &str) -> Outcome {
    if let Some(rest) = url.strip_prefix("fake://") {
        let ms = rest.split('/').next().unwrap_or("0").parse::<u64>().unwrap_or(0);
        thread::sleep(Duration::from_millis(ms));
        return Ok(FakeTransport::body_for(url));
    }
    if url.starts_with("dns://") {
        return Err(TransferError::Curl(curl::Error::new(COULDNT_RESOLVE_HOST)));
    }
    if url.starts_with("panic://") {
        panic!("fake transport panic for {}", url);
    }
    Err(TransferError::Curl(curl::Error::new(UNSUPPORTED_PROTOCOL)))
}

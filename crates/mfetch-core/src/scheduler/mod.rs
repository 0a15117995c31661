//! Completion-driven scheduler.
//!
//! Keeps up to `W = min(N, max_concurrent)` transfers in flight, records
//! each completion as it is observed (not in request order), and refills
//! the freed slot with the next pending URL. A failed transfer is recorded
//! and scheduling continues; only resource-allocation failures abort the
//! run, after every occupied slot has been released.
//!
//! Two drivers share the slot pool and aggregator:
//! - `threaded`: one scoped worker per occupied slot, completions over a channel.
//! - `multi`: one curl multi handle driven from the calling thread.

mod aggregate;
mod multi;
mod pool;
mod threaded;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::transfer::Outcome;
use crate::transport::{CurlTransport, Transport};

pub use aggregate::{Aggregator, FetchResult};
pub use pool::{Slot, SlotId, SlotPool};

/// Hard ceiling on concurrent transfers, whatever the configuration says.
pub const MAX_WINDOW: usize = 10;

/// Default bound on how long the scheduler blocks waiting for a completion.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

/// Which driver runs a multi-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// Scoped worker thread per slot, completions over an mpsc channel.
    #[default]
    Threads,
    /// Single-threaded curl multi event loop.
    Multi,
}

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Requested concurrency; clamped to `1..=MAX_WINDOW`.
    pub max_concurrent: usize,
    /// Bounded wait between polls when nothing has completed.
    pub wait_timeout: Duration,
    pub backend: FetchBackend,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_WINDOW,
            wait_timeout: DEFAULT_WAIT,
            backend: FetchBackend::default(),
        }
    }
}

/// A transfer finished in `slot` with `outcome`.
#[derive(Debug)]
pub struct CompletionEvent {
    pub slot: SlotId,
    pub outcome: Outcome,
}

/// Window size for `n` URLs: `min(n, max_concurrent)` with `max_concurrent`
/// clamped to `1..=MAX_WINDOW`.
pub fn window(n: usize, max_concurrent: usize) -> usize {
    n.min(max_concurrent.clamp(1, MAX_WINDOW))
}

/// Fetch every URL with libcurl using the configured driver.
pub fn run(
    transport: &CurlTransport<'_>,
    urls: &[String],
    opts: &SchedulerOptions,
) -> Result<FetchResult, FetchError> {
    let w = window(urls.len(), opts.max_concurrent);
    let wait = positive(opts.wait_timeout);
    tracing::debug!(
        urls = urls.len(),
        window = w,
        backend = ?opts.backend,
        "multi-fetch starting"
    );
    let res = match opts.backend {
        FetchBackend::Threads => threaded::run_threaded(transport, urls, w, wait),
        FetchBackend::Multi => multi::run_multi(transport, urls, w, wait),
    };
    if let Ok(ref r) = res {
        tracing::info!(
            urls = urls.len(),
            ok = r.successes(),
            failed = r.failures(),
            "multi-fetch finished"
        );
    }
    res
}

/// Fetch every URL through any [`Transport`] with the channel driver.
pub fn run_with<T: Transport>(
    transport: &T,
    urls: &[String],
    max_concurrent: usize,
    wait_timeout: Duration,
) -> Result<FetchResult, FetchError> {
    let w = window(urls.len(), max_concurrent);
    threaded::run_threaded(transport, urls, w, positive(wait_timeout))
}

fn positive(wait: Duration) -> Duration {
    if wait.is_zero() {
        Duration::from_millis(1)
    } else {
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;
    use crate::transfer::{classify, FailureKind, TransferError};
    use std::sync::atomic::Ordering;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn window_is_capped_at_ten() {
        assert_eq!(window(15, 10), 10);
        assert_eq!(window(15, 64), 10);
        assert_eq!(window(3, 10), 3);
        assert_eq!(window(5, 0), 1);
        assert_eq!(window(0, 10), 0);
    }

    #[test]
    fn three_urls_all_succeed() {
        let t = FakeTransport::new();
        let u = urls(&["fake://0/a", "fake://0/b", "fake://0/c"]);
        let res = run_with(&t, &u, MAX_WINDOW, DEFAULT_WAIT).unwrap();
        assert_eq!(res.len(), 3);
        for url in &u {
            assert_eq!(res.get(url).unwrap().as_ref().unwrap(), &FakeTransport::body_for(url));
        }
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let t = FakeTransport::new();
        let u = urls(&[
            "fake://5/a",
            "fake://5/b",
            "dns://nowhere.invalid/",
            "fake://5/c",
            "fake://5/d",
        ]);
        let res = run_with(&t, &u, MAX_WINDOW, DEFAULT_WAIT).unwrap();
        assert_eq!(res.len(), 5);
        assert_eq!(res.successes(), 4);
        let err = res.get("dns://nowhere.invalid/").unwrap().as_ref().unwrap_err();
        assert_eq!(classify(err), FailureKind::Dns);
    }

    #[test]
    fn fifteen_urls_never_exceed_ten_active() {
        let t = FakeTransport::new();
        let u: Vec<String> = (0..15).map(|i| format!("fake://30/{}", i)).collect();
        let res = run_with(&t, &u, MAX_WINDOW, DEFAULT_WAIT).unwrap();
        assert_eq!(res.len(), 15);
        assert_eq!(res.completion_order().len(), 15);
        let peak = t.peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_WINDOW, "peak {} exceeds window", peak);
        assert!(peak > 1, "transfers should overlap, peak {}", peak);
        assert_eq!(t.opened.load(Ordering::SeqCst), 15);
    }

    #[test]
    fn completions_are_recorded_in_arrival_order() {
        let t = FakeTransport::new();
        let u = urls(&["fake://300/slow", "fake://0/fast"]);
        let res = run_with(&t, &u, 2, DEFAULT_WAIT).unwrap();
        assert_eq!(res.completion_order(), &[1, 0]);
    }

    #[test]
    fn window_of_one_refills_fifo() {
        let t = FakeTransport::new();
        let u = urls(&["fake://10/a", "fake://0/b", "fake://5/c", "fake://0/d"]);
        let res = run_with(&t, &u, 1, DEFAULT_WAIT).unwrap();
        assert_eq!(res.completion_order(), &[0, 1, 2, 3]);
        assert_eq!(t.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn short_wait_still_collects_slow_transfers() {
        let t = FakeTransport::new();
        let u = urls(&["fake://50/a", "fake://80/b"]);
        let res = run_with(&t, &u, MAX_WINDOW, Duration::from_millis(1)).unwrap();
        assert_eq!(res.successes(), 2);
    }

    #[test]
    fn repeated_wait_timeouts_keep_the_loop_running() {
        let t = FakeTransport::new();
        let u = urls(&["fake://120/a", "fake://0/b", "fake://60/c"]);
        let res = run_with(&t, &u, 1, Duration::from_millis(1)).unwrap();
        assert_eq!(res.successes(), 3);
        assert_eq!(res.completion_order(), &[0, 1, 2]);
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn zero_wait_is_treated_as_positive() {
        let t = FakeTransport::new();
        let u = urls(&["fake://20/a", "fake://0/b"]);
        let res = run_with(&t, &u, MAX_WINDOW, Duration::ZERO).unwrap();
        assert_eq!(res.len(), 2);
    }

    #[test]
    fn duplicate_urls_each_fetched_once_per_occurrence() {
        let t = FakeTransport::new();
        let u = urls(&["fake://0/same", "fake://0/other", "fake://0/same"]);
        let res = run_with(&t, &u, MAX_WINDOW, DEFAULT_WAIT).unwrap();
        assert_eq!(t.opened.load(Ordering::SeqCst), 3);
        assert_eq!(res.completion_order().len(), 3);
        assert_eq!(res.len(), 2);
    }

    #[test]
    fn worker_panic_becomes_a_failure_outcome() {
        let t = FakeTransport::new();
        let u = urls(&["panic://boom", "fake://0/ok"]);
        let res = run_with(&t, &u, MAX_WINDOW, DEFAULT_WAIT).unwrap();
        assert!(matches!(
            res.get("panic://boom").unwrap(),
            Err(TransferError::Panicked)
        ));
        assert!(res.get("fake://0/ok").unwrap().is_ok());
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn allocation_failure_aborts_and_releases_every_unit() {
        let t = FakeTransport::new().fail_open_at(4);
        let u: Vec<String> = (0..8).map(|i| format!("fake://20/{}", i)).collect();
        let err = run_with(&t, &u, 3, DEFAULT_WAIT).unwrap_err();
        assert!(err.is_allocation());
        assert!(matches!(err, FetchError::Allocation { .. }));
        assert_eq!(t.live(), 0, "no transfer resource may outlive the abort");
    }

    #[test]
    fn allocation_failure_while_seeding() {
        let t = FakeTransport::new().fail_open_at(1);
        let u = urls(&["fake://50/a", "fake://0/b", "fake://0/c"]);
        let err = run_with(&t, &u, MAX_WINDOW, DEFAULT_WAIT).unwrap_err();
        assert!(err.is_allocation());
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn empty_list_runs_nothing() {
        let t = FakeTransport::new();
        let res = run_with(&t, &[], MAX_WINDOW, DEFAULT_WAIT).unwrap();
        assert!(res.is_empty());
        assert_eq!(t.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backend_names() {
        #[derive(Deserialize)]
        struct W {
            backend: FetchBackend,
        }
        let w: W = toml::from_str("backend = \"multi\"").unwrap();
        assert_eq!(w.backend, FetchBackend::Multi);
        let w: W = toml::from_str("backend = \"threads\"").unwrap();
        assert_eq!(w.backend, FetchBackend::Threads);
    }
}

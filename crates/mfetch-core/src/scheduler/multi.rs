//! Curl multi driver: single-threaded event loop over Easy2 handles.
//!
//! perform (non-blocking tick), drain completion messages, match each one
//! against the slot table, release, refill, and wait on the sockets only
//! when nothing completed.

use std::time::Duration;

use curl::multi::{Easy2Handle, Multi};

use crate::error::FetchError;
use crate::transfer::TransferError;
use crate::transport::{Collector, CurlTransport, CurlUnit, Transport};

use super::aggregate::{Aggregator, FetchResult};
use super::pool::{SlotId, SlotPool};

type HandlePool = SlotPool<Easy2Handle<Collector>>;

pub(super) fn run_multi(
    transport: &CurlTransport<'_>,
    urls: &[String],
    window: usize,
    wait: Duration,
) -> Result<FetchResult, FetchError> {
    let mut pool: HandlePool = SlotPool::with_capacity(window.min(urls.len()))?;
    run_in(transport, urls, wait, &mut pool, |url| transport.open(url))
}

/// Drive `urls` through `pool`, creating each unit with `open`. On an engine
/// error every handle still in the pool is removed from the multi handle
/// before the error is returned.
fn run_in<F>(
    transport: &CurlTransport<'_>,
    urls: &[String],
    wait: Duration,
    pool: &mut HandlePool,
    mut open: F,
) -> Result<FetchResult, FetchError>
where
    F: FnMut(&str) -> Result<CurlUnit, FetchError>,
{
    let mut aggregator = Aggregator::new(urls)?;
    if urls.is_empty() {
        return Ok(aggregator.finish());
    }
    let multi = Multi::new();
    if let Err(e) = drive(&multi, transport, &mut open, urls, wait, pool, &mut aggregator) {
        tracing::warn!(
            error = %e,
            active = pool.occupied(),
            recorded = aggregator.recorded(),
            "aborting fetch; removing in-flight handles"
        );
        for slot in pool.drain() {
            if let Some(handle) = slot.into_handle() {
                let _ = multi.remove2(handle);
            }
        }
        return Err(e);
    }
    Ok(aggregator.finish())
}

fn drive<F>(
    multi: &Multi,
    transport: &CurlTransport<'_>,
    open: &mut F,
    urls: &[String],
    wait: Duration,
    pool: &mut HandlePool,
    aggregator: &mut Aggregator<'_>,
) -> Result<(), FetchError>
where
    F: FnMut(&str) -> Result<CurlUnit, FetchError>,
{
    let n = urls.len();
    let mut next = 0usize;
    refill(multi, &mut *open, urls, pool, aggregator, &mut next)?;

    let mut done: Vec<(SlotId, Result<(), curl::Error>)> = Vec::with_capacity(pool.capacity());
    while pool.occupied() > 0 {
        multi.perform()?;
        multi.messages(|msg| {
            for (id, slot) in pool.occupied_slots() {
                if let Some(res) = slot.handle().and_then(|h| msg.result_for2(h)) {
                    done.push((id, res));
                    break;
                }
            }
        });
        let completed = done.len();
        for (id, res) in done.drain(..) {
            let Some(slot) = pool.release(id) else {
                continue;
            };
            let url_index = slot.url_index();
            // Matched through its handle above, so the handle is present.
            let Some(handle) = slot.into_handle() else {
                continue;
            };
            let mut easy = multi.remove2(handle)?;
            aggregator.record(url_index, transport.finish(&mut easy, res));
        }
        refill(multi, &mut *open, urls, pool, aggregator, &mut next)?;
        tracing::trace!(completed, active = pool.occupied(), pending = n - next, "multi tick");
        if completed == 0 && pool.occupied() > 0 {
            multi.wait(&mut [], wait)?;
        }
    }
    Ok(())
}

/// Fill free slots from the pending queue in request order.
fn refill<F>(
    multi: &Multi,
    open: &mut F,
    urls: &[String],
    pool: &mut HandlePool,
    aggregator: &mut Aggregator<'_>,
    next: &mut usize,
) -> Result<(), FetchError>
where
    F: FnMut(&str) -> Result<CurlUnit, FetchError>,
{
    while *next < urls.len() && pool.has_free() {
        let url_index = *next;
        *next += 1;
        let CurlUnit { easy, setup } = open(&urls[url_index])?;
        if let Some(e) = setup {
            // Never reaches the multi handle; completes immediately.
            aggregator.record(url_index, Err(TransferError::Curl(e)));
            continue;
        }
        let slot = pool.acquire(url_index)?;
        match multi.add2(easy) {
            Ok(handle) => {
                if let Err(handle) = pool.attach(slot, handle) {
                    let _ = multi.remove2(handle);
                }
                tracing::debug!(url_index, slot, url = %urls[url_index], "transfer started");
            }
            Err(e) => {
                pool.release(slot);
                return Err(FetchError::Multi(e));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::transport::CurlOptions;
    use std::fs;

    const WAIT: Duration = Duration::from_millis(10);

    fn oom() -> FetchError {
        FetchError::Allocation { what: "test handle" }
    }

    #[test]
    fn open_failure_while_seeding_removes_added_handles() {
        let session = Session::initialize();
        let transport = session.transport(CurlOptions::default());
        // Never performed: the third open fails before the first tick.
        let urls: Vec<String> = (0..5).map(|i| format!("http://127.0.0.1:9/{}", i)).collect();
        let mut pool: HandlePool = SlotPool::with_capacity(3).unwrap();
        let mut opened = 0;
        let err = run_in(&transport, &urls, WAIT, &mut pool, |url| {
            opened += 1;
            if opened == 3 {
                return Err(oom());
            }
            transport.open(url)
        })
        .unwrap_err();
        assert!(err.is_allocation());
        assert_eq!(opened, 3);
        assert_eq!(pool.occupied(), 0);
    }

    #[test]
    fn open_failure_mid_run_removes_in_flight_handles() {
        let dir = tempfile::tempdir().unwrap();
        let urls: Vec<String> = (0..4)
            .map(|i| {
                let path = dir.path().join(format!("{}.txt", i));
                fs::write(&path, format!("file {}", i)).unwrap();
                format!("file://{}", path.display())
            })
            .collect();
        let session = Session::initialize();
        let transport = session.transport(CurlOptions::default());
        let mut pool: HandlePool = SlotPool::with_capacity(2).unwrap();
        let mut opened = 0;
        // Units 1 and 2 seed the window; unit 3 is added once one of them
        // completes, and unit 4 fails while it may still be attached.
        let err = run_in(&transport, &urls, WAIT, &mut pool, |url| {
            opened += 1;
            if opened == 4 {
                return Err(oom());
            }
            transport.open(url)
        })
        .unwrap_err();
        assert!(matches!(err, FetchError::Allocation { .. }));
        assert_eq!(opened, 4);
        assert_eq!(pool.occupied(), 0);
    }

    #[test]
    fn body_buffer_allocation_failure_aborts_before_any_transfer() {
        let session = Session::initialize();
        let transport = session.transport(CurlOptions {
            initial_body_capacity: usize::MAX,
            ..CurlOptions::default()
        });
        let urls: Vec<String> = (0..3).map(|i| format!("http://127.0.0.1:9/{}", i)).collect();
        let err = run_multi(&transport, &urls, 3, WAIT).unwrap_err();
        assert!(err.is_allocation());
    }
}

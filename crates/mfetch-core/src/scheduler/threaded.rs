//! Channel driver: each occupied slot runs its transfer on a scoped worker
//! thread that publishes exactly one completion; this thread consumes the
//! channel, records outcomes and refills freed slots FIFO.

use std::iter;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;

use crate::error::FetchError;
use crate::transfer::TransferError;
use crate::transport::Transport;

use super::aggregate::{Aggregator, FetchResult};
use super::pool::{SlotId, SlotPool};
use super::CompletionEvent;

type WorkerPool<'scope> = SlotPool<ScopedJoinHandle<'scope, ()>>;

/// Run every URL through `transport` with at most `window` transfers in flight.
pub(super) fn run_threaded<T: Transport>(
    transport: &T,
    urls: &[String],
    window: usize,
    wait: Duration,
) -> Result<FetchResult, FetchError> {
    let mut aggregator = Aggregator::new(urls)?;
    if urls.is_empty() {
        return Ok(aggregator.finish());
    }
    thread::scope(|scope| drive(scope, transport, urls, window, wait, &mut aggregator))?;
    Ok(aggregator.finish())
}

fn drive<'scope, 'env, T: Transport>(
    scope: &'scope Scope<'scope, 'env>,
    transport: &'env T,
    urls: &'env [String],
    window: usize,
    wait: Duration,
    aggregator: &mut Aggregator<'_>,
) -> Result<(), FetchError> {
    let mut pool: WorkerPool<'scope> = SlotPool::with_capacity(window.min(urls.len()))?;
    let (tx, rx) = mpsc::channel();
    let mut next = 0usize;
    let res = schedule(scope, transport, urls, wait, &mut pool, &tx, &rx, &mut next, aggregator);
    if let Err(ref e) = res {
        tracing::warn!(
            error = %e,
            active = pool.occupied(),
            recorded = aggregator.recorded(),
            "aborting fetch; waiting for in-flight transfers"
        );
        // No cancellation: joining waits for each in-flight transfer to end,
        // after which its unit has been dropped on the worker.
        for slot in pool.drain() {
            if let Some(handle) = slot.into_handle() {
                let _ = handle.join();
            }
        }
    }
    res
}

#[allow(clippy::too_many_arguments)]
fn schedule<'scope, 'env, T: Transport>(
    scope: &'scope Scope<'scope, 'env>,
    transport: &'env T,
    urls: &'env [String],
    wait: Duration,
    pool: &mut WorkerPool<'scope>,
    tx: &Sender<CompletionEvent>,
    rx: &Receiver<CompletionEvent>,
    next: &mut usize,
    aggregator: &mut Aggregator<'_>,
) -> Result<(), FetchError> {
    let n = urls.len();
    while *next < n && pool.has_free() {
        start(scope, transport, urls, pool, tx, *next)?;
        *next += 1;
    }

    while pool.occupied() > 0 {
        let first = match rx.recv_timeout(wait) {
            Ok(event) => event,
            // `tx` lives in this frame, so the channel never disconnects.
            Err(_) => {
                tracing::trace!(active = pool.occupied(), "no completion within {:?}", wait);
                continue;
            }
        };
        let mut completed = 0usize;
        for event in iter::once(first).chain(rx.try_iter()) {
            let Some(slot) = pool.release(event.slot) else {
                tracing::warn!(slot = event.slot, "completion for a free slot ignored");
                continue;
            };
            let url_index = slot.url_index();
            if let Some(handle) = slot.into_handle() {
                // The worker has already sent; this only reaps the thread.
                let _ = handle.join();
            }
            aggregator.record(url_index, event.outcome);
            completed += 1;
        }
        while *next < n && pool.has_free() {
            start(scope, transport, urls, pool, tx, *next)?;
            *next += 1;
        }
        tracing::trace!(
            completed,
            active = pool.occupied(),
            pending = n - *next,
            "completions drained"
        );
    }
    Ok(())
}

/// Occupy a slot for `url_index` and start its transfer on a worker.
fn start<'scope, 'env, T: Transport>(
    scope: &'scope Scope<'scope, 'env>,
    transport: &'env T,
    urls: &'env [String],
    pool: &mut WorkerPool<'scope>,
    tx: &Sender<CompletionEvent>,
    url_index: usize,
) -> Result<SlotId, FetchError> {
    let slot = pool.acquire(url_index)?;
    let unit = match transport.open(&urls[url_index]) {
        Ok(unit) => unit,
        Err(e) => {
            pool.release(slot);
            return Err(e);
        }
    };
    let tx = tx.clone();
    let spawned = thread::Builder::new()
        .name(format!("mfetch-slot-{}", slot))
        .spawn_scoped(scope, move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| transport.perform(unit)))
                .unwrap_or_else(|_| Err(TransferError::Panicked));
            let _ = tx.send(CompletionEvent { slot, outcome });
        });
    match spawned {
        Ok(handle) => {
            // Slot was acquired above and nothing else touches the pool.
            let _ = pool.attach(slot, handle);
            tracing::debug!(url_index, slot, url = %urls[url_index], "transfer started");
            Ok(slot)
        }
        Err(e) => {
            pool.release(slot);
            Err(FetchError::Spawn(e))
        }
    }
}

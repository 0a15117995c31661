//! Engine-level errors.
//!
//! Per-URL transport failures are not errors at this level; they are
//! recorded in the result mapping as [`crate::TransferError`]. A
//! `FetchError` means the whole call failed and no mapping was produced.

use crate::request::RequestError;
use crate::transfer::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request was rejected before any transfer started.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Memory for the slot table, result map, or a per-transfer buffer or
    /// handle could not be obtained. All acquired slots were released.
    #[error("could not allocate {what}")]
    Allocation { what: &'static str },

    /// A transfer worker thread could not be started.
    #[error("could not start transfer worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// `acquire` was called with no free slot.
    #[error("all {capacity} transfer slots are in use")]
    PoolExhausted { capacity: usize },

    /// The curl multi handle failed (perform, wait, add or remove).
    #[error("curl multi: {0}")]
    Multi(#[from] curl::MultiError),

    /// Single-URL fetch failed; the reason is the transport failure itself.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The blocking task running an async fetch panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// True for resource-allocation failures (the engine abort path).
    pub fn is_allocation(&self) -> bool {
        matches!(
            self,
            FetchError::Allocation { .. } | FetchError::Spawn(_) | FetchError::PoolExhausted { .. }
        )
    }
}

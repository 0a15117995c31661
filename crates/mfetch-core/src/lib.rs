pub mod config;
pub mod logging;

pub mod checksum;
pub mod client;
pub mod encode;
pub mod error;
pub mod request;
pub mod scheduler;
pub mod session;
pub mod single;
pub mod transfer;
pub mod transport;

pub use client::{fetch_async, FetchOptions, Fetched, Fetcher};
pub use error::FetchError;
pub use request::{FetchRequest, RequestError};
pub use scheduler::{FetchBackend, FetchResult};
pub use session::Session;
pub use transfer::{FailureKind, Outcome, TransferError};

//! CLI command handlers.

mod encode;
mod fetch;

pub use encode::{run_decode, run_encode};
pub use fetch::{run_fetch, FetchArgs};

//! The fetcher value a host constructs once with its URLs and calls `fetch` on.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::request::FetchRequest;
use crate::scheduler::{self, FetchBackend, FetchResult, SchedulerOptions};
use crate::session::Session;
use crate::single;
use crate::transport::CurlOptions;

/// Everything that shapes a fetch besides the URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub scheduler: SchedulerOptions,
    pub curl: CurlOptions,
}

impl FetchOptions {
    pub fn with_backend(mut self, backend: FetchBackend) -> Self {
        self.scheduler.backend = backend;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.scheduler.max_concurrent = max;
        self
    }

    pub fn with_wait_timeout(mut self, wait: Duration) -> Self {
        self.scheduler.wait_timeout = wait;
        self
    }
}

/// What `fetch` returns: the bare body for a one-URL request, the full
/// mapping otherwise.
#[derive(Debug)]
pub enum Fetched {
    Body(Vec<u8>),
    Map(FetchResult),
}

impl Fetched {
    pub fn into_map(self) -> Option<FetchResult> {
        match self {
            Fetched::Map(m) => Some(m),
            Fetched::Body(_) => None,
        }
    }

    pub fn into_body(self) -> Option<Vec<u8>> {
        match self {
            Fetched::Body(b) => Some(b),
            Fetched::Map(_) => None,
        }
    }
}

/// A validated request bound to a transport session.
#[derive(Debug, Clone)]
pub struct Fetcher<'s> {
    session: &'s Session,
    request: FetchRequest,
    options: FetchOptions,
}

impl<'s> Fetcher<'s> {
    pub fn new(session: &'s Session, request: FetchRequest, options: FetchOptions) -> Self {
        Self {
            session,
            request,
            options,
        }
    }

    pub fn urls(&self) -> &[String] {
        self.request.urls()
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch every URL. One URL goes through the single-fetch path and
    /// yields its body (or the transfer error); more go through the
    /// scheduler and yield one entry per URL.
    pub fn fetch(&self) -> Result<Fetched, FetchError> {
        let transport = self.session.transport(self.options.curl);
        let urls = self.request.urls();
        if let [url] = urls {
            return single::fetch_one(&transport, url).map(Fetched::Body);
        }
        scheduler::run(&transport, urls, &self.options.scheduler).map(Fetched::Map)
    }
}

/// Run a fetch on tokio's blocking pool so async callers don't stall their
/// executor for the duration of the transfers.
pub async fn fetch_async(
    session: Arc<Session>,
    request: FetchRequest,
    options: FetchOptions,
) -> Result<Fetched, FetchError> {
    tokio::task::spawn_blocking(move || Fetcher::new(&session, request, options).fetch()).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::MAX_WINDOW;

    #[test]
    fn options_builders() {
        let o = FetchOptions::default()
            .with_backend(FetchBackend::Multi)
            .with_max_concurrent(4)
            .with_wait_timeout(Duration::from_millis(250));
        assert_eq!(o.scheduler.backend, FetchBackend::Multi);
        assert_eq!(o.scheduler.max_concurrent, 4);
        assert_eq!(o.scheduler.wait_timeout, Duration::from_millis(250));
        assert_eq!(FetchOptions::default().scheduler.max_concurrent, MAX_WINDOW);
    }

    #[test]
    fn fetched_accessors() {
        assert_eq!(Fetched::Body(b"x".to_vec()).into_body(), Some(b"x".to_vec()));
        assert!(Fetched::Body(Vec::new()).into_map().is_none());
        assert!(Fetched::Map(FetchResult::default()).into_map().is_some());
    }

    #[test]
    fn single_url_failure_is_reported_as_transfer_error() {
        let session = Session::initialize();
        let fetcher = Fetcher::new(
            &session,
            FetchRequest::single("nosuchscheme://host/"),
            FetchOptions::default(),
        );
        assert!(matches!(fetcher.fetch(), Err(FetchError::Transfer(_))));
    }
}

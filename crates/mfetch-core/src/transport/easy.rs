//! libcurl transport: one Easy2 handle per transfer.

use curl::easy::Easy2;

use crate::error::FetchError;
use crate::session::Session;
use crate::transfer::{Outcome, TransferError};

use super::collector::Collector;
use super::{CurlOptions, Transport};

/// Creates and runs libcurl handles. Borrowing the [`Session`] ties every
/// transport to a process where libcurl has been initialized.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport<'s> {
    _session: &'s Session,
    opts: CurlOptions,
}

/// One configured handle with its body buffer. `setup` holds a non-fatal
/// option error (e.g. a URL with an interior NUL) to report as the outcome.
pub struct CurlUnit {
    pub(crate) easy: Easy2<Collector>,
    pub(crate) setup: Option<curl::Error>,
}

impl<'s> CurlTransport<'s> {
    pub(crate) fn new(session: &'s Session, opts: CurlOptions) -> Self {
        Self {
            _session: session,
            opts,
        }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.opts
    }

    /// Build the outcome for a handle whose transfer has finished with `result`.
    pub(crate) fn finish(
        &self,
        easy: &mut Easy2<Collector>,
        result: Result<(), curl::Error>,
    ) -> Outcome {
        result?;
        if self.opts.fail_on_http_error {
            let code = easy.response_code()?;
            if !(200..300).contains(&code) {
                return Err(TransferError::Http(code));
            }
        }
        Ok(easy.get_mut().take_body())
    }
}

/// Apply URL and per-handle options. GET with redirects followed.
fn configure(easy: &mut Easy2<Collector>, url: &str, opts: &CurlOptions) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.get(true)?;
    // Handles may run on worker threads; keep libcurl away from signals.
    easy.signal(false)?;
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    if let Some(t) = opts.timeout {
        easy.timeout(t)?;
    }
    if let Some(sz) = opts.buffer_size {
        easy.buffer_size(sz)?;
    }
    Ok(())
}

impl Transport for CurlTransport<'_> {
    type Unit = CurlUnit;

    fn open(&self, url: &str) -> Result<CurlUnit, FetchError> {
        let collector = Collector::with_capacity(self.opts.initial_body_capacity)
            .map_err(|_| FetchError::Allocation { what: "transfer body buffer" })?;
        let mut easy = Easy2::new(collector);
        let setup = match configure(&mut easy, url, &self.opts) {
            Ok(()) => None,
            Err(e) if e.is_out_of_memory() => {
                return Err(FetchError::Allocation { what: "curl handle" });
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "curl rejected handle options");
                Some(e)
            }
        };
        Ok(CurlUnit { easy, setup })
    }

    fn perform(&self, unit: CurlUnit) -> Outcome {
        let CurlUnit { mut easy, setup } = unit;
        if let Some(e) = setup {
            return Err(TransferError::Curl(e));
        }
        let result = easy.perform();
        self.finish(&mut easy, result)
    }
}

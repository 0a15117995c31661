//! Result aggregation: one outcome per URL occurrence, keyed by URL text.

use std::collections::HashMap;

use crate::error::FetchError;
use crate::transfer::Outcome;

/// Final mapping from URL to outcome, handed to the caller only after
/// every transfer has completed.
///
/// When the request repeats a URL, each occurrence is fetched and recorded,
/// and the one that completed last is the entry kept under that key.
#[derive(Debug, Default)]
pub struct FetchResult {
    entries: HashMap<String, Outcome>,
    completion_order: Vec<usize>,
}

impl FetchResult {
    pub fn get(&self, url: &str) -> Option<&Outcome> {
        self.entries.get(url)
    }

    /// Number of distinct URLs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Outcome)> {
        self.entries.iter()
    }

    /// Request indices in the order their completions were observed.
    pub fn completion_order(&self) -> &[usize] {
        &self.completion_order
    }

    pub fn successes(&self) -> usize {
        self.entries.values().filter(|o| o.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.entries.values().filter(|o| o.is_err()).count()
    }

    pub fn into_map(self) -> HashMap<String, Outcome> {
        self.entries
    }
}

impl IntoIterator for FetchResult {
    type Item = (String, Outcome);
    type IntoIter = std::collections::hash_map::IntoIter<String, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Collects outcomes as the scheduler observes completions.
#[derive(Debug)]
pub struct Aggregator<'a> {
    urls: &'a [String],
    entries: HashMap<String, Outcome>,
    recorded: Vec<bool>,
    completion_order: Vec<usize>,
}

impl<'a> Aggregator<'a> {
    /// Reserves room for every entry up front; fails with an allocation error
    /// rather than growing mid-run.
    pub fn new(urls: &'a [String]) -> Result<Self, FetchError> {
        let n = urls.len();
        let mut entries = HashMap::new();
        entries
            .try_reserve(n)
            .map_err(|_| FetchError::Allocation { what: "result map" })?;
        let mut recorded = Vec::new();
        recorded
            .try_reserve_exact(n)
            .map_err(|_| FetchError::Allocation { what: "result bookkeeping" })?;
        recorded.resize(n, false);
        let mut completion_order = Vec::new();
        completion_order
            .try_reserve_exact(n)
            .map_err(|_| FetchError::Allocation { what: "result bookkeeping" })?;
        Ok(Self {
            urls,
            entries,
            recorded,
            completion_order,
        })
    }

    /// Write `outcome` under `urls[url_index]`. Each index is accepted once;
    /// an out-of-range or repeated index is ignored and returns false.
    pub fn record(&mut self, url_index: usize, outcome: Outcome) -> bool {
        let Some(url) = self.urls.get(url_index) else {
            tracing::warn!(url_index, "completion for unknown url index ignored");
            return false;
        };
        if self.recorded[url_index] {
            tracing::warn!(url_index, %url, "second completion for url index ignored");
            return false;
        }
        self.recorded[url_index] = true;
        self.completion_order.push(url_index);
        match &outcome {
            Ok(body) => tracing::debug!(url_index, %url, bytes = body.len(), "transfer ok"),
            Err(e) => tracing::debug!(url_index, %url, error = %e, "transfer failed"),
        }
        if self.entries.insert(url.clone(), outcome).is_some() {
            tracing::debug!(url_index, %url, "duplicate url: later result replaces earlier");
        }
        true
    }

    /// Number of indices recorded so far.
    pub fn recorded(&self) -> usize {
        self.completion_order.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completion_order.len() == self.urls.len()
    }

    pub fn finish(self) -> FetchResult {
        FetchResult {
            entries: self.entries,
            completion_order: self.completion_order,
        }
    }
}

//! Construction-time validation of the URLs to fetch.

/// Rejected input; raised before the engine starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("at least one URL is required")]
    Empty,
}

/// Ordered, non-empty list of URLs. Duplicates are kept and each occurrence
/// is fetched on its own. URLs are opaque: nothing here checks that they parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    urls: Vec<String>,
}

impl FetchRequest {
    pub fn new<I, S>(urls: I) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return Err(RequestError::Empty);
        }
        Ok(Self { urls })
    }

    pub fn single(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.urls.len() == 1
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Parse a URL list file: one URL per line, blank lines and `#` comments skipped.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

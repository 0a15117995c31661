//! Fetch command: run one fetch over the given URLs and report per-URL outcomes.

use anyhow::{Context, Result};
use mfetch_core::checksum::sha256_hex;
use mfetch_core::config::{self, MfetchConfig};
use mfetch_core::request::parse_url_list;
use mfetch_core::transfer::classify;
use mfetch_core::{
    fetch_async, FetchBackend, FetchError, FetchRequest, Fetched, Outcome, Session,
    TransferError,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parsed `fetch` arguments.
#[derive(Debug, Default)]
pub struct FetchArgs {
    pub urls: Vec<String>,
    pub urls_file: Option<PathBuf>,
    pub backend: Option<FetchBackend>,
    pub max_concurrent: Option<usize>,
    pub wait_ms: Option<u64>,
    pub fail_on_http_error: bool,
    pub json: bool,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// One line of the report.
#[derive(Debug, Serialize)]
struct UrlReport {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl UrlReport {
    fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Ok(body) => Self {
                ok: true,
                bytes: Some(body.len()),
                sha256: Some(sha256_hex(body)),
                kind: None,
                error: None,
            },
            Err(e) => Self::failed(e),
        }
    }

    fn failed(e: &TransferError) -> Self {
        Self {
            ok: false,
            bytes: None,
            sha256: None,
            kind: Some(classify(e).to_string()),
            error: Some(e.to_string()),
        }
    }
}

/// Config file (explicit or default) with command-line overrides applied.
fn effective_config(args: &FetchArgs) -> Result<MfetchConfig> {
    let mut cfg = match &args.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    if let Some(b) = args.backend {
        cfg.backend = b;
    }
    if let Some(n) = args.max_concurrent {
        cfg.max_concurrent = n;
    }
    if let Some(ms) = args.wait_ms {
        cfg.wait_timeout_ms = ms;
    }
    if args.fail_on_http_error {
        cfg.fail_on_http_error = true;
    }
    Ok(cfg)
}

fn collect_urls(args: &FetchArgs) -> Result<Vec<String>> {
    let mut urls = args.urls.clone();
    if let Some(path) = &args.urls_file {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        urls.extend(parse_url_list(&text));
    }
    Ok(urls)
}

fn write_body(dir: &Path, index: usize, body: &[u8]) -> Result<()> {
    let path = dir.join(format!("{}.body", index));
    fs::write(&path, body).with_context(|| format!("write {}", path.display()))
}

/// Run the fetch. Per-URL failures are reported, not returned; only engine
/// errors (allocation, spawn, multi handle) make this fail.
pub async fn run_fetch(args: FetchArgs) -> Result<()> {
    let cfg = effective_config(&args)?;
    tracing::debug!("effective config: {:?}", cfg);
    let urls = collect_urls(&args)?;
    let request = FetchRequest::new(urls)?;
    let urls = request.urls().to_vec();

    let session = Arc::new(Session::initialize());
    let fetched = fetch_async(Arc::clone(&session), request, cfg.to_fetch_options()).await;

    // Report in input order; a repeated URL is reported once.
    let mut reports: Vec<(usize, &str, UrlReport)> = Vec::with_capacity(urls.len());
    match fetched {
        Ok(Fetched::Body(body)) => {
            if let Some(dir) = &args.output_dir {
                fs::create_dir_all(dir)?;
                write_body(dir, 0, &body)?;
            }
            reports.push((0, urls[0].as_str(), UrlReport::from_outcome(&Ok(body))));
        }
        Err(FetchError::Transfer(e)) => {
            reports.push((0, urls[0].as_str(), UrlReport::failed(&e)));
        }
        Ok(Fetched::Map(result)) => {
            if let Some(dir) = &args.output_dir {
                fs::create_dir_all(dir)?;
            }
            let mut seen = HashSet::new();
            for (index, url) in urls.iter().enumerate() {
                if !seen.insert(url.as_str()) {
                    continue;
                }
                let Some(outcome) = result.get(url) else {
                    continue;
                };
                if let (Some(dir), Ok(body)) = (&args.output_dir, outcome) {
                    write_body(dir, index, body)?;
                }
                reports.push((index, url.as_str(), UrlReport::from_outcome(outcome)));
            }
            tracing::info!(
                "fetched {} urls: {} ok, {} failed",
                result.len(),
                result.successes(),
                result.failures()
            );
        }
        Err(e) => return Err(e).context("fetch failed"),
    }

    if args.json {
        let map: BTreeMap<&str, &UrlReport> =
            reports.iter().map(|(_, url, r)| (*url, r)).collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (index, url, r) in &reports {
            match (&r.sha256, &r.error) {
                (Some(digest), _) => println!(
                    "[{}] ok    {} bytes  {}  {}",
                    index,
                    r.bytes.unwrap_or(0),
                    digest,
                    url
                ),
                (None, error) => println!(
                    "[{}] fail  {}: {}  {}",
                    index,
                    r.kind.as_deref().unwrap_or("other"),
                    error.as_deref().unwrap_or(""),
                    url
                ),
            }
        }
    }

    if let Ok(session) = Arc::try_unwrap(session) {
        session.shutdown();
    }
    Ok(())
}

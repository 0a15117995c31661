//! CLI for the mfetch multi-URL fetcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mfetch_core::FetchBackend;
use std::path::PathBuf;

use commands::{run_decode, run_encode, run_fetch, FetchArgs};

/// Top-level CLI for mfetch.
#[derive(Debug, Parser)]
#[command(name = "mfetch")]
#[command(about = "mfetch: fetch many URLs concurrently through libcurl", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Driver selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Threads,
    Multi,
}

impl From<BackendArg> for FetchBackend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Threads => FetchBackend::Threads,
            BackendArg::Multi => FetchBackend::Multi,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch one or more URLs and report each outcome.
    Fetch {
        /// URLs to fetch, in order.
        urls: Vec<String>,

        /// Read additional URLs from a file (one per line, '#' comments allowed).
        #[arg(long, value_name = "PATH")]
        urls_file: Option<PathBuf>,

        /// Scheduler driver (overrides config).
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// Maximum concurrent transfers, 1..=10 (overrides config).
        #[arg(long, value_name = "N")]
        max_concurrent: Option<usize>,

        /// Milliseconds to block waiting for a completion before re-polling.
        #[arg(long, value_name = "MS")]
        wait_ms: Option<u64>,

        /// Treat a non-2xx HTTP status as a failed transfer.
        #[arg(long)]
        fail_on_http_error: bool,

        /// Print a JSON report instead of one line per URL.
        #[arg(long)]
        json: bool,

        /// Write each successful body to <DIR>/<index>.body.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Config file to use instead of ~/.config/mfetch/config.toml.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Percent-encode a string.
    Encode {
        text: String,
    },

    /// Percent-decode a string.
    Decode {
        text: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                urls,
                urls_file,
                backend,
                max_concurrent,
                wait_ms,
                fail_on_http_error,
                json,
                output_dir,
                config,
            } => {
                let args = FetchArgs {
                    urls,
                    urls_file,
                    backend: backend.map(FetchBackend::from),
                    max_concurrent,
                    wait_ms,
                    fail_on_http_error,
                    json,
                    output_dir,
                    config,
                };
                run_fetch(args).await?;
            }
            CliCommand::Encode { text } => run_encode(&text)?,
            CliCommand::Decode { text } => run_decode(&text)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

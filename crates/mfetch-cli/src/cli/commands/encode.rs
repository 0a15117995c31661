//! Encode/decode commands: libcurl's percent-encoding helpers.

use anyhow::{Context, Result};
use mfetch_core::encode;

pub fn run_encode(text: &str) -> Result<()> {
    println!("{}", encode::percent_encode(text));
    Ok(())
}

pub fn run_decode(text: &str) -> Result<()> {
    let decoded = encode::percent_decode_utf8(text).context("decoded bytes are not UTF-8")?;
    println!("{}", decoded);
    Ok(())
}

//! Percent-encoding helpers (libcurl's escape/unescape). Stateless.

use std::string::FromUtf8Error;

/// Percent-encode every byte outside `A-Z a-z 0-9 - . _ ~`.
pub fn percent_encode(input: &str) -> String {
    curl::easy::Easy::new().url_encode(input.as_bytes())
}

/// Decode `%XX` escapes into raw bytes. Malformed escapes are left as-is.
pub fn percent_decode(input: &str) -> Vec<u8> {
    curl::easy::Easy::new().url_decode(input)
}

/// Decode `%XX` escapes and require the result to be UTF-8.
pub fn percent_decode_utf8(input: &str) -> Result<String, FromUtf8Error> {
    String::from_utf8(percent_decode(input))
}

//! Input URL handling
//!
//! The fetcher reads a plain text file with one URL per line. This module
//! checks the URLs and produces that file's contents.

use anyhow::Result;
use url::Url;

/// Checks that the list is non-empty and every entry is a well-formed URI
pub fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        anyhow::bail!("at least one URL is required");
    }

    for (idx, url) in urls.iter().enumerate() {
        if !is_well_formed_url(url) {
            anyhow::bail!("URL #{} is not a well-formed URI: {:?}", idx + 1, url);
        }
    }

    Ok(())
}

/// Returns true for an absolute URL with a non-empty host
///
/// Whitespace and control characters are rejected rather than left to the
/// parser to encode or strip.
pub fn is_well_formed_url(raw: &str) -> bool {
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    // `https:///path` would otherwise parse with `path` as its host
    if raw
        .split_once("://")
        .is_some_and(|(_, rest)| rest.starts_with('/'))
    {
        return false;
    }

    match Url::parse(raw) {
        Ok(url) => url.host_str().is_some_and(|host| !host.is_empty()),
        Err(_) => false,
    }
}

/// Renders the URL list file: one URL per line, in order, newline terminated
pub fn render_url_list(urls: &[String]) -> String {
    let mut out = String::with_capacity(urls.iter().map(|u| u.len() + 1).sum());
    for url in urls {
        out.push_str(url);
        out.push('\n');
    }
    out
}

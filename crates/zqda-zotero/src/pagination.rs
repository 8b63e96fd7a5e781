//! `Link` header pagination
//!
//! Multi-object responses carry a header of the form
//!
//! ```text
//! Link: <https://api.zotero.org/groups/1/items?start=100&limit=100>; rel="next",
//!       <https://api.zotero.org/groups/1/items?start=300&limit=100>; rel="last"
//! ```
//!
//! and the listing is exhausted when no `rel="next"` entry is present.

use reqwest::header::{HeaderMap, LINK};
use url::Url;

use crate::ZoteroError;

/// Target of the `rel="next"` link, if any
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(parse_next)
}

fn parse_next(entry: &str) -> Option<String> {
    let mut parts = entry.split(';').map(str::trim);
    let target = parts.next()?.strip_prefix('<')?.strip_suffix('>')?;
    let is_next = parts.any(|param| {
        param
            .strip_prefix("rel=")
            .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
            .unwrap_or(false)
    });
    is_next.then(|| target.to_string())
}

/// Resolve a link target against the client's base URL
///
/// Absolute targets are used as-is; relative ones are joined onto `base`.
pub fn resolve(base: &str, target: &str) -> Result<Url, ZoteroError> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|base| base.join(target))
            .map_err(|e| ZoteroError::InvalidResponse(format!("Bad next link {target}: {e}"))),
        Err(e) => Err(ZoteroError::InvalidResponse(format!(
            "Bad next link {target}: {e}"
        ))),
    }
}

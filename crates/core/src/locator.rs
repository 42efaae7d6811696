//! Finds the sourcemap belonging to a fetched script.
//!
//! Strategies run in a fixed order and the first success wins:
//! inline `data:` payload, referenced `sourceMappingURL`, then `<script>.map`.
//! A failure at one step only moves on to the next.

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::fetch::Fetcher;

static INLINE_MAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?://|/\*)[#@]\s*sourceMappingURL=data:application/json(?:;charset=[^;,]+)?;base64,([A-Za-z0-9+/=]+)")
        .unwrap()
});

static MAP_COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"//[#@]\s*sourceMappingURL\s*=\s*(\S+)|/\*[#@]\s*sourceMappingURL\s*=\s*([^*\s]+)\s*\*/").unwrap()
});

// Bundlers are inconsistent about trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("inline sourcemap is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Where a located map came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapSource {
    Inline,
    Referenced(Url),
    Conventional(Url),
}

#[derive(Debug, Clone)]
pub struct LocatedMap {
    pub bytes: Vec<u8>,
    pub source: MapSource,
}

impl LocatedMap {
    /// URL the map was fetched from; `None` for inline maps.
    pub fn url(&self) -> Option<&Url> {
        match &self.source {
            MapSource::Inline => None,
            MapSource::Referenced(u) | MapSource::Conventional(u) => Some(u),
        }
    }
}

impl fmt::Display for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapSource::Inline => f.write_str("inline map"),
            MapSource::Referenced(u) => write!(f, "map {}", u),
            MapSource::Conventional(u) => write!(f, "map {} (guessed)", u),
        }
    }
}

/// Decode the last inline base64 sourcemap comment, if there is one.
pub fn inline_map(js: &str) -> Option<Result<Vec<u8>, DecodeError>> {
    let caps = INLINE_MAP_RE.captures_iter(js).last()?;
    let payload = caps.get(1)?.as_str();
    Some(LENIENT_BASE64.decode(payload).map_err(DecodeError::from))
}

/// Extract raw sourcemap references from JavaScript text, in document order.
pub fn extract_sourcemap_urls(js: &str) -> Vec<String> {
    MAP_COMMENT_RE
        .captures_iter(js)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().trim_matches(['"', '\'']).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The trailing `sourceMappingURL` reference resolved against the script URL.
/// `data:` references are never returned.
pub fn referenced_map_url(js: &str, script_url: &Url) -> Option<Url> {
    let raw = extract_sourcemap_urls(js).pop()?;
    if raw.to_ascii_lowercase().starts_with("data:") {
        return None;
    }
    script_url.join(&raw).ok()
}

/// `<script path>.map` at the script's own location, without query or fragment.
pub fn conventional_map_url(script_url: &Url) -> Url {
    let mut guess = script_url.clone();
    let path = format!("{}.map", script_url.path());
    guess.set_path(&path);
    guess.set_query(None);
    guess.set_fragment(None);
    guess
}

/// Run the three strategies in order and return the first map found.
pub async fn locate_map(fetcher: &dyn Fetcher, js: &str, script_url: &Url) -> Option<LocatedMap> {
    match inline_map(js) {
        Some(Ok(bytes)) => return Some(LocatedMap { bytes, source: MapSource::Inline }),
        Some(Err(e)) => log::warn!("{}: {}", script_url, e),
        None => {}
    }

    if let Some(map_url) = referenced_map_url(js, script_url) {
        match fetcher.fetch(&map_url).await {
            Ok(bytes) => return Some(LocatedMap { bytes, source: MapSource::Referenced(map_url) }),
            Err(e) => log::warn!("failed to fetch map {}: {}", map_url, e),
        }
    }

    let guess = conventional_map_url(script_url);
    match fetcher.fetch(&guess).await {
        Ok(bytes) => Some(LocatedMap { bytes, source: MapSource::Conventional(guess) }),
        Err(e) => {
            debug!("no map at {}: {}", guess, e);
            None
        }
    }
}

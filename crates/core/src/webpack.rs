//! Best-effort discovery of dynamically named bundle chunks.
//!
//! None of this parses JavaScript. Each [`ChunkNamingStrategy`] recognises one
//! textual convention a bundler uses to build chunk filenames at runtime and
//! will miss anything written differently.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// A chunk URL derived from a script, with the script that referenced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCandidate {
    pub url: Url,
    pub parent: Url,
}

/// One bundler convention for naming chunks.
pub trait ChunkNamingStrategy: Send + Sync {
    /// Candidate chunk URLs referenced by `script_text`, which was fetched from `script_url`.
    fn derive(&self, script_text: &str, script_url: &Url) -> Vec<ChunkCandidate>;
}

#[derive(Error, Debug)]
#[error("unreadable chunk table: {0}")]
pub struct ChunkTableError(#[from] serde_json::Error);

// return "static/js/"+e+"."+{20:"493d026d",21:"5f0ee513"}[e]+".chunk.js"
static RETURN_CHUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"return\s*["']([^"']*)["']\s*\+\s*(\w+)\s*\+\s*["'][^"']*["']\s*\+\s*(\{[^{}]*\})\s*\[\s*(\w+)\s*\]\s*\+\s*["']\.chunk\.js["']"#,
    )
    .unwrap()
});

static BARE_INT_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([{,]\s*)(-?\d+)(\s*:)"#).unwrap());

/// Quote bare integer object keys: `{20:"x", 21 :"y"}` becomes `{"20":"x", "21" :"y"}`.
/// Keys that are already quoted are left alone.
pub fn quote_numeric_keys(literal: &str) -> String {
    BARE_INT_KEY_RE.replace_all(literal, r#"${1}"${2}"${3}"#).into_owned()
}

/// Decode an `{id: "hash"}` object literal with possibly unquoted integer keys.
pub fn parse_chunk_table(literal: &str) -> Result<HashMap<i64, String>, ChunkTableError> {
    Ok(serde_json::from_str(&quote_numeric_keys(literal))?)
}

/// Resolve a synthesised chunk filename.
///
/// An absolute name (scheme and host) is kept as is; anything else is
/// resolved against the directory of the current script.
pub fn resolve_chunk_name(name: &str, script_url: &Url) -> Option<Url> {
    match Url::parse(name) {
        Ok(abs) if abs.has_host() => Some(abs),
        _ => script_url.join(name).ok(),
    }
}

/// Recognises the create-react-app style runtime:
/// `return "<prefix>" + v + "." + {<id>: "<hash>", ...}[v] + ".chunk.js"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReturnObjectStrategy;

impl ChunkNamingStrategy for ReturnObjectStrategy {
    fn derive(&self, script_text: &str, script_url: &Url) -> Vec<ChunkCandidate> {
        if !script_text.contains(".chunk.js") {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for caps in RETURN_CHUNK_RE.captures_iter(script_text) {
            let (Some(prefix), Some(var), Some(table), Some(var2)) =
                (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
            else {
                continue;
            };
            if var.as_str() != var2.as_str() {
                continue;
            }
            let table = match parse_chunk_table(table.as_str()) {
                Ok(t) => t,
                Err(e) => {
                    log::debug!("{}: {}", script_url, e);
                    continue;
                }
            };

            for (id, hash) in table {
                let name = format!("{}{}.{}.chunk.js", prefix.as_str(), id, hash);
                if let Some(url) = resolve_chunk_name(&name, script_url) {
                    if seen.insert(url.as_str().to_owned()) {
                        out.push(ChunkCandidate { url, parent: script_url.clone() });
                    }
                }
            }
        }
        out
    }
}

/// Run every strategy and merge their candidates, de-duplicated by URL.
pub fn derive_chunks(strategies: &[std::sync::Arc<dyn ChunkNamingStrategy>], script_text: &str, script_url: &Url) -> Vec<ChunkCandidate> {
    let mut seen = HashSet::new();
    strategies
        .iter()
        .flat_map(|s| s.derive(script_text, script_url))
        .filter(|c| seen.insert(c.url.as_str().to_owned()))
        .collect()
}

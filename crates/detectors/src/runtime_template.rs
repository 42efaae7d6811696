use std::collections::HashSet;

use mapsalvage_core::{ChunkCandidate, ChunkNamingStrategy};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Represents the discovered pattern that Webpack uses to construct chunk URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFilenameTemplate {
    pub prefix: String,
    pub suffix: String,
}

impl ChunkFilenameTemplate {
    pub fn filename(&self, chunk_id: &str) -> String {
        format!("{}{}{}", self.prefix, chunk_id, self.suffix)
    }
}

// Regexes for various helper forms; tried in order until one matches.
static CHUNK_URL_FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"__webpack_require__\.u\s*=\s*function[^\{]*\{[^}]*?return\s+"([^"]*)"\s*\+\s*[^+]+\+\s*"([^"]*)";"#).unwrap()
});

static CHUNK_URL_ARROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"__webpack_require__\.u\s*=\s*\([^)]*\)\s*=>\s*"([^"]*)"\s*\+\s*[^+]+\+\s*"([^"]*)";"#).unwrap()
});

static CHUNK_URL_TMPL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"__webpack_require__\.u\s*=\s*function[^\{]*\{[^}]*?return\s+`([^`]*?)\$\{[^}]+}([^`]*?)`;"#).unwrap()
});

static PUBLIC_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"__webpack_require__\.p\s*=\s*"([^"]*)";"#).unwrap()
});

static CHUNK_PUSH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"webpackChunk(?:_\w+)?\.push\(\[\["?([\w-]+)"?,"#).unwrap()
});

// 7561===e?"static/chunks/7561-be856e985935a49b.js"
static HARDCODED_CASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\d+)\s*===\s*\w+\s*\?\s*"static/chunks/\d+-[^"]+\.js""#).unwrap()
});

/// Infer prefix & suffix used to build chunk URLs.
pub fn infer_chunk_filename_template(js: &str) -> Option<ChunkFilenameTemplate> {
    [&*CHUNK_URL_FN_RE, &*CHUNK_URL_ARROW_RE, &*CHUNK_URL_TMPL_RE]
        .into_iter()
        .find_map(|re| {
            let caps = re.captures(js)?;
            Some(ChunkFilenameTemplate {
                prefix: caps.get(1)?.as_str().to_string(),
                suffix: caps.get(2)?.as_str().to_string(),
            })
        })
}

/// Extract configured public path, if present.
pub fn extract_public_path(js: &str) -> Option<String> {
    let caps = PUBLIC_PATH_RE.captures(js)?;
    let path = caps.get(1)?.as_str();
    if path.is_empty() { None } else { Some(path.to_string()) }
}

/// Chunk ids named in `webpackChunk*.push` calls and hard-coded `id===e?` cases, first occurrence order.
pub fn extract_chunk_ids(js: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    CHUNK_PUSH_RE
        .captures_iter(js)
        .chain(HARDCODED_CASE_RE.captures_iter(js))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Webpack 4/5 runtimes that publish `__webpack_require__.u` as a plain
/// `prefix + id + suffix` template.
///
/// The public path, when set, is the base; otherwise names resolve against the
/// script's directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeTemplateStrategy;

impl ChunkNamingStrategy for RuntimeTemplateStrategy {
    fn derive(&self, script_text: &str, script_url: &Url) -> Vec<ChunkCandidate> {
        let Some(template) = infer_chunk_filename_template(script_text) else {
            return Vec::new();
        };
        let ids = extract_chunk_ids(script_text);
        if ids.is_empty() {
            log::debug!("{}: chunk template found but no chunk ids", script_url);
            return Vec::new();
        }

        let base = extract_public_path(script_text)
            .and_then(|p| script_url.join(&p).ok())
            .unwrap_or_else(|| script_url.clone());

        let mut seen = HashSet::new();
        ids.iter()
            .filter_map(|id| base.join(&template.filename(id)).ok())
            .filter(|u| seen.insert(u.as_str().to_owned()))
            .map(|url| ChunkCandidate { url, parent: script_url.clone() })
            .collect()
    }
}

use std::collections::HashSet;

use mapsalvage_core::{ChunkCandidate, ChunkNamingStrategy};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static CHUNK_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"static/chunks/[^"'\s]+?\.js"#).unwrap()
});

/// Extract `static/chunks/*.js` paths from a Next.js `_buildManifest.js`, de-duplicated in order.
pub fn extract_paths_from_build_manifest(js: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    CHUNK_PATH_RE
        .find_iter(js)
        .map(|m| m.as_str().to_string())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Base URL under which `prefix` paths live, derived from a script URL.
///
/// If the script path contains `prefix` (e.g. `/_next/static/abc/_buildManifest.js`
/// with `static/`), everything from the last occurrence on is cut so that
/// `base + prefix...` reproduces the layout. Otherwise the origin root is used.
pub fn derive_base_from_runtime(runtime_url: &Url, prefix: &str) -> Url {
    let mut base = runtime_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    let path = runtime_url.path();
    match path.rfind(prefix) {
        Some(idx) => {
            let mut new_path = path[..idx].to_string();
            if !new_path.ends_with('/') {
                new_path.push('/');
            }
            base.set_path(&new_path);
        }
        None => base.set_path("/"),
    }
    base
}

/// Next.js build manifests list every page chunk as a literal path.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildManifestStrategy;

impl ChunkNamingStrategy for BuildManifestStrategy {
    fn derive(&self, script_text: &str, script_url: &Url) -> Vec<ChunkCandidate> {
        if !script_url.path().ends_with("_buildManifest.js") {
            return Vec::new();
        }
        let base = derive_base_from_runtime(script_url, "static/");
        extract_paths_from_build_manifest(script_text)
            .iter()
            .filter_map(|p| base.join(p).ok())
            .map(|url| ChunkCandidate { url, parent: script_url.clone() })
            .collect()
    }
}

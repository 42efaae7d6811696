use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static SCRIPT_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<script[^>]+src\s*=\s*['"]([^'"]+)['"]"#).unwrap()
});

/// Resolve `raw` against `base`, skipping blank values and unparsable references.
fn resolve_src(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok()
}

fn dedupe(urls: impl IntoIterator<Item = Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(u.as_str().to_owned()))
        .collect()
}

/// Script URLs referenced by `<script src>` elements, resolved against the page URL.
///
/// De-duplicated by URL string, first occurrence wins. The DOM result is
/// authoritative even when empty; the raw markup is only scanned with a
/// pattern when the structural pass cannot run at all.
pub fn find_scripts(html: &str, page_url: &Url) -> Vec<Url> {
    match extract_script_urls_dom(html, page_url) {
        Some(found) => found,
        None => {
            log::debug!("structural pass unavailable for {}; using pattern scan", page_url);
            extract_script_urls(html, page_url)
        }
    }
}

fn extract_script_urls_dom(html: &str, base: &Url) -> Option<Vec<Url>> {
    let selector = Selector::parse("script[src]").ok()?;
    let doc = Html::parse_document(html);
    let found: Vec<Url> = doc
        .select(&selector)
        .filter_map(|el| el.value().attr("src"))
        .filter_map(|src| resolve_src(base, src))
        .collect();
    Some(dedupe(found))
}

/// Pattern-based scan for `<script ... src="...">`, same resolution and de-duplication rules.
pub fn extract_script_urls(html: &str, base: &Url) -> Vec<Url> {
    let found: Vec<Url> = SCRIPT_SRC_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| resolve_src(base, m.as_str()))
        .collect();
    dedupe(found)
}

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use url::Url;

use crate::path_reconstruct::sanitize_segment;

/// Ensure the given output directory exists. Creates missing parent directories as needed.
///
/// Returns Ok(()) if the directory already exists (and is a directory) or is successfully created.
/// Returns an io::Error if creation fails or if a non-directory entity exists at the path.
pub fn ensure_output_dir<P: AsRef<Path>>(output_path: P) -> io::Result<()> {
    let path = output_path.as_ref();
    if path.exists() {
        if !path.is_dir() {
            return Err(io::Error::new(ErrorKind::AlreadyExists, "Output path exists but is not a directory"));
        }
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Write `contents` to `path`, creating its parent directories first.
pub fn write_with_parents(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_output_dir(parent)?;
    }
    fs::write(path, contents)
}

/// Per-script output namespace: `<host>/<script directory>`.
///
/// Every component is sanitised so URL paths can never climb out of the crawl base.
pub fn host_path_for_url(script_url: &Url) -> PathBuf {
    let mut out = PathBuf::from(sanitize_segment(script_url.host_str().unwrap_or("unknown-host")));
    let path = script_url.path();
    let dir = match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    };
    for seg in dir.split('/').filter(|s| !s.is_empty()) {
        out.push(sanitize_segment(seg));
    }
    out
}

/// Last path segment of a URL, or `fallback` when the URL ends in `/`.
pub fn url_basename(url: &Url, fallback: &str) -> String {
    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .filter(|s| !s.is_empty())
        .map(sanitize_segment)
        .unwrap_or_else(|| fallback.to_string())
}

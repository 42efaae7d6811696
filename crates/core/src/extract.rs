use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::anchor::AnchorTree;
use crate::format::{beautify_basic, normalize_eol, Eol};
use crate::output::{ensure_output_dir, write_with_parents};
use crate::sm_parse::{parse_sourcemap, SourcemapDocument, SourcemapError};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Malformed(#[from] SourcemapError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Content post-processing applied before each file is written.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub beautify: bool,
    pub eol: Option<Eol>,
}

impl ExtractOptions {
    fn render(&self, content: &str) -> String {
        let content = if self.beautify {
            beautify_basic(content)
        } else {
            content.to_string()
        };
        normalize_eol(&content, self.eol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NoContent,
    PathBlocked,
    ChunkDepthExceeded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoContent => "no content",
            SkipReason::PathBlocked => "path blocked",
            SkipReason::ChunkDepthExceeded => "chunk depth exceeded",
        })
    }
}

/// Outcome of one `sources` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractEvent {
    Written { source: String, path: PathBuf },
    Skipped { source: String, reason: SkipReason },
    Failed { source: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    pub written: usize,
    pub skipped: usize,
    pub events: Vec<ExtractEvent>,
}

impl ExtractSummary {
    fn push(&mut self, event: ExtractEvent) {
        match &event {
            ExtractEvent::Written { source, path } => {
                debug!("written {} -> {}", source, path.display());
                self.written += 1;
            }
            ExtractEvent::Skipped { source, reason } => {
                debug!("skipped ({}): {}", reason, source);
                self.skipped += 1;
            }
            ExtractEvent::Failed { source, reason } => warn!("failed {}: {}", source, reason),
        }
        self.events.push(event);
    }
}

/// What a write failure does to the rest of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPolicy {
    /// Stop and return [`ExtractError::Io`].
    Abort,
    /// Record an [`ExtractEvent::Failed`] and continue with the next entry.
    Report,
}

/// Anchor tree for `doc` under `out_dir`, sized from entries with content only.
pub fn anchor_for(doc: &SourcemapDocument, out_dir: &Path) -> AnchorTree {
    let normalized: Vec<String> = (0..doc.sources.len())
        .filter(|&i| doc.has_content(i))
        .map(|i| doc.normalized_source(i))
        .collect();
    AnchorTree::for_paths(out_dir, normalized.iter().map(String::as_str))
}

/// Write every non-empty source of `doc` below `out_dir`.
pub fn extract_all(
    doc: &SourcemapDocument,
    out_dir: &Path,
    options: &ExtractOptions,
    policy: IoPolicy,
) -> Result<ExtractSummary, ExtractError> {
    let tree = anchor_for(doc, out_dir);
    debug!("anchor depth {} for {}", tree.depth(), out_dir.display());

    let mut summary = ExtractSummary::default();
    for i in 0..doc.sources.len() {
        let source = doc.source(i).to_string();
        if !doc.has_content(i) {
            summary.push(ExtractEvent::Skipped { source, reason: SkipReason::NoContent });
            continue;
        }

        let recovered = match tree.resolve(&doc.normalized_source(i)) {
            Ok(r) => r,
            Err(_) => {
                summary.push(ExtractEvent::Skipped { source, reason: SkipReason::PathBlocked });
                continue;
            }
        };

        let body = options.render(doc.content(i));
        match write_with_parents(&recovered.path, body.as_bytes()) {
            Ok(()) => summary.push(ExtractEvent::Written { source, path: recovered.path }),
            Err(e) if policy == IoPolicy::Report => summary.push(ExtractEvent::Failed {
                source,
                reason: format!("{}: {}", recovered.path.display(), e),
            }),
            Err(e) => {
                return Err(ExtractError::Io { path: recovered.path, source: e });
            }
        }
    }
    Ok(summary)
}

/// Decode `map_bytes` and recover its sources into `out_dir`.
///
/// Any I/O failure aborts the run; traversal and empty entries are skipped.
pub fn extract(map_bytes: &[u8], out_dir: &Path, options: &ExtractOptions) -> Result<ExtractSummary, ExtractError> {
    let doc = parse_sourcemap(map_bytes)?;
    ensure_output_dir(out_dir).map_err(|e| ExtractError::Io { path: out_dir.to_path_buf(), source: e })?;
    let summary = extract_all(&doc, out_dir, options, IoPolicy::Abort)?;
    info!(
        "{}: {} written, {} skipped",
        doc.file.as_deref().unwrap_or("sourcemap"),
        summary.written,
        summary.skipped
    );
    Ok(summary)
}

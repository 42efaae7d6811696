use serde::Deserialize;
use thiserror::Error;

use crate::path_reconstruct::{join_source_root, normalize};

#[derive(Error, Debug)]
pub enum SourcemapError {
    #[error("invalid sourcemap JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no 'sources' in sourcemap")]
    NoSources,
}

/// The subset of a v3 sourcemap needed to recover original files.
///
/// `sourcesContent` is index-aligned with `sources` and may be shorter, `null`
/// or contain `null` entries; all of those read as empty content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcemapDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub sources: Vec<Option<String>>,
    #[serde(default)]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub source_root: Option<String>,
}

impl SourcemapDocument {
    /// Content aligned with `sources[i]`, or `""` when missing.
    pub fn content(&self, i: usize) -> &str {
        self.sources_content
            .as_ref()
            .and_then(|c| c.get(i))
            .and_then(|c| c.as_deref())
            .unwrap_or("")
    }

    /// Whether `sources[i]` has content worth writing. Whitespace-only counts as empty.
    pub fn has_content(&self, i: usize) -> bool {
        !self.content(i).trim().is_empty()
    }

    /// Raw path of `sources[i]` (empty for `null` entries).
    pub fn source(&self, i: usize) -> &str {
        self.sources.get(i).and_then(|s| s.as_deref()).unwrap_or("")
    }

    /// `sourceRoot` joined with `sources[i]`, then normalised.
    pub fn normalized_source(&self, i: usize) -> String {
        let root = self.source_root.as_deref().unwrap_or("");
        normalize(&join_source_root(root, self.source(i)))
    }
}

/// Decode a sourcemap document. Zero `sources` is rejected.
pub fn parse_sourcemap(bytes: &[u8]) -> Result<SourcemapDocument, SourcemapError> {
    let doc: SourcemapDocument = serde_json::from_slice(bytes)?;
    if doc.sources.is_empty() {
        return Err(SourcemapError::NoSources);
    }
    Ok(doc)
}

/// Convenience helper: the raw `sources` list.
pub fn sources_list(doc: &SourcemapDocument) -> Vec<String> {
    (0..doc.sources.len())
        .map(|i| doc.source(i).to_string())
        .collect()
}

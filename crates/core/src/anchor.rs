use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::path_reconstruct::{count_leading_ups, sanitize_segments, UNNAMED_SEGMENT};

/// Hidden working folder inside the output directory. Never part of a final path.
pub const ANCHOR_DIR: &str = ".anchor";
const LEVEL_DIR: &str = "level";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("path traversal blocked: {path}")]
    TraversalBlocked { path: String },
}

/// A file destination produced by [`AnchorTree::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredFile {
    /// Sanitised, `/`-separated path relative to the output directory.
    pub relative: String,
    /// `relative` joined under the output directory.
    pub path: PathBuf,
}

/// Synthetic containment root: `<out>/.anchor` with a sub-anchor nested
/// `depth` levels beneath it.
///
/// `depth` is the worst leading-`..` run of the document, so a path that
/// climbs at most that far lands somewhere inside the anchor and keeps its
/// nesting. Anything that climbs further is refused.
#[derive(Debug, Clone)]
pub struct AnchorTree {
    out_dir: PathBuf,
    depth: usize,
}

impl AnchorTree {
    pub fn new(out_dir: impl Into<PathBuf>, depth: usize) -> Self {
        Self {
            out_dir: out_dir.into(),
            depth,
        }
    }

    /// Size the anchor from every normalised path whose content is non-empty.
    pub fn for_paths<'a, I>(out_dir: impl Into<PathBuf>, normalized: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let depth = normalized.into_iter().map(count_leading_ups).max().unwrap_or(0);
        Self::new(out_dir, depth)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `<out>/.anchor`.
    pub fn base_anchor(&self) -> PathBuf {
        self.out_dir.join(ANCHOR_DIR)
    }

    /// `<out>/.anchor/level/.../level` (`depth` times).
    pub fn sub_anchor(&self) -> PathBuf {
        let mut sub = self.base_anchor();
        for _ in 0..self.depth {
            sub.push(LEVEL_DIR);
        }
        sub
    }

    /// Resolve a normalised path to a destination inside the output directory.
    ///
    /// The path is joined under the sub-anchor and cleaned lexically. If the
    /// cleaned path still has to climb above the base anchor the call fails
    /// with [`PathError::TraversalBlocked`]; nothing is clamped.
    pub fn resolve(&self, normalized: &str) -> Result<RecoveredFile, PathError> {
        let mut stack: Vec<&str> = vec![LEVEL_DIR; self.depth];

        for seg in normalized.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    if stack.pop().is_none() {
                        return Err(PathError::TraversalBlocked {
                            path: normalized.to_string(),
                        });
                    }
                }
                other => stack.push(other),
            }
        }

        let relative = if stack.is_empty() {
            UNNAMED_SEGMENT.to_string()
        } else {
            sanitize_segments(&stack.join("/"))
        };

        let mut path = self.out_dir.clone();
        path.extend(relative.split('/'));

        Ok(RecoveredFile { relative, path })
    }
}

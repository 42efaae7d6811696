//! Extra chunk-naming conventions for the crawler.
//!
//! Each detector implements [`ChunkNamingStrategy`] and is registered with
//! `Crawler::with_strategy`. They are heuristics over raw text and will miss
//! runtimes written in other shapes.

pub mod build_manifest;
pub mod runtime_template;

pub use build_manifest::BuildManifestStrategy;
pub use runtime_template::{ChunkFilenameTemplate, RuntimeTemplateStrategy};

use std::sync::Arc;

use mapsalvage_core::ChunkNamingStrategy;

/// Every detector in this crate, ready to hand to the crawler.
pub fn all() -> Vec<Arc<dyn ChunkNamingStrategy>> {
    vec![Arc::new(RuntimeTemplateStrategy), Arc::new(BuildManifestStrategy)]
}

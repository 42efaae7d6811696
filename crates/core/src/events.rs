use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use url::Url;

use crate::extract::SkipReason;

/// Everything a crawl worker reports. Counting happens in [`Aggregator`], never in the workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    Processing { url: Url },
    ChunkDiscovered { url: Url, parent: Url },
    /// A map was decoded and `count` of its sources were written.
    Written { script: Url, map: String, count: usize },
    Skipped { resource: String, reason: SkipReason },
    Failed { resource: String, reason: String },
    NoSourcemap { script: Url },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlTotals {
    pub scripts_processed: usize,
    pub chunks_discovered: usize,
    pub maps_found: usize,
    pub files_written: usize,
    pub skipped: usize,
    pub failures: usize,
    pub without_sourcemap: usize,
}

impl CrawlTotals {
    pub fn record(&mut self, event: &CrawlEvent) {
        match event {
            CrawlEvent::Processing { .. } => self.scripts_processed += 1,
            CrawlEvent::ChunkDiscovered { .. } => self.chunks_discovered += 1,
            CrawlEvent::Written { count, .. } => {
                self.maps_found += 1;
                self.files_written += count;
            }
            CrawlEvent::Skipped { .. } => self.skipped += 1,
            CrawlEvent::Failed { .. } => self.failures += 1,
            CrawlEvent::NoSourcemap { .. } => self.without_sourcemap += 1,
        }
    }
}

fn log_event(event: &CrawlEvent) {
    match event {
        CrawlEvent::Processing { url } => info!("processing {}", url),
        CrawlEvent::ChunkDiscovered { url, parent } => info!("discovered chunk {} (from {})", url, parent),
        CrawlEvent::Written { script, map, count } => info!("written {} files from {} for {}", count, map, script),
        CrawlEvent::Skipped { resource, reason } => log::debug!("skipped ({}): {}", reason, resource),
        CrawlEvent::Failed { resource, reason } => warn!("{}: {}", resource, reason),
        CrawlEvent::NoSourcemap { script } => warn!("no sourcemap for {}", script),
    }
}

/// Single consumer of worker events: logs each one and keeps the totals.
pub struct Aggregator {
    rx: mpsc::UnboundedReceiver<CrawlEvent>,
}

impl Aggregator {
    pub fn channel() -> (mpsc::UnboundedSender<CrawlEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Drain until every sender is dropped.
    pub async fn run(mut self) -> (CrawlTotals, Vec<CrawlEvent>) {
        let mut totals = CrawlTotals::default();
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            log_event(&event);
            totals.record(&event);
            events.push(event);
        }
        (totals, events)
    }
}

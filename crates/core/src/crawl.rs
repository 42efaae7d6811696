use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task;
use url::Url;

use crate::events::{Aggregator, CrawlEvent, CrawlTotals};
use crate::extract::{extract_all, ExtractEvent, ExtractOptions, IoPolicy, SkipReason};
use crate::fetch::{ClientConfig, FetchError, Fetcher, HttpFetcher};
use crate::locator::{locate_map, LocatedMap};
use crate::output::{ensure_output_dir, host_path_for_url, url_basename, write_with_parents};
use crate::sm_parse::parse_sourcemap;
use crate::url_utils::find_scripts;
use crate::webpack::{derive_chunks, ChunkNamingStrategy, ReturnObjectStrategy};

const RAW_SCRIPT_FALLBACK: &str = "script.js";
const RAW_MAP_FALLBACK: &str = "sourcemap.json";

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Client(#[from] FetchError),
    #[error("failed to fetch root page {url}: {source}")]
    RootFetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("cannot create output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Crawl configuration
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub extract: ExtractOptions,
    pub client: ClientConfig,
    pub save_raw_script: bool,
    pub save_raw_map: bool,
    /// How many levels of derived chunks are followed below a page script.
    pub max_chunk_depth: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            client: ClientConfig::default(),
            save_raw_script: false,
            save_raw_map: false,
            max_chunk_depth: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub root: Url,
    pub scripts_discovered: usize,
    pub totals: CrawlTotals,
    pub events: Vec<CrawlEvent>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Shared, read-only state of one crawl plus its visited set.
struct Worker {
    fetcher: Arc<dyn Fetcher>,
    strategies: Vec<Arc<dyn ChunkNamingStrategy>>,
    options: CrawlOptions,
    out_base: PathBuf,
    visited: Mutex<HashSet<String>>,
    events: mpsc::UnboundedSender<CrawlEvent>,
}

impl Worker {
    fn emit(&self, event: CrawlEvent) {
        // Only fails once the aggregator is gone, which happens after all workers finish.
        let _ = self.events.send(event);
    }

    fn is_visited(&self, url: &Url) -> bool {
        let visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
        visited.contains(url.as_str())
    }

    fn mark_visited(&self, url: &Url) -> bool {
        let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
        visited.insert(url.as_str().to_owned())
    }

    /// Fetch one script, follow its chunks inline, then locate and extract its map.
    fn process_script(&self, url: Url, parent: Option<Url>, depth: usize) -> BoxFuture<'_, ()> {
        async move {
            if !self.mark_visited(&url) {
                debug!("already visited {}", url);
                return;
            }
            if let Some(parent) = parent {
                self.emit(CrawlEvent::ChunkDiscovered { url: url.clone(), parent });
            }
            self.emit(CrawlEvent::Processing { url: url.clone() });

            let bytes = match self.fetcher.fetch(&url).await {
                Ok(b) => b,
                Err(e) => {
                    self.emit(CrawlEvent::Failed {
                        resource: url.to_string(),
                        reason: format!("failed to fetch script: {}", e),
                    });
                    return;
                }
            };
            let text = String::from_utf8_lossy(&bytes).into_owned();

            for chunk in derive_chunks(&self.strategies, &text, &url) {
                if self.is_visited(&chunk.url) {
                    continue;
                }
                if depth >= self.options.max_chunk_depth {
                    self.emit(CrawlEvent::Skipped {
                        resource: chunk.url.to_string(),
                        reason: SkipReason::ChunkDepthExceeded,
                    });
                    continue;
                }
                self.process_script(chunk.url, Some(chunk.parent), depth + 1).await;
            }

            let out_dir = self.out_base.join(host_path_for_url(&url));

            if self.options.save_raw_script {
                let dest = out_dir.join(url_basename(&url, RAW_SCRIPT_FALLBACK));
                if let Err(e) = write_with_parents(&dest, &bytes) {
                    self.emit(CrawlEvent::Failed {
                        resource: dest.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            match locate_map(self.fetcher.as_ref(), &text, &url).await {
                Some(map) => self.process_map(&url, map, &out_dir),
                None => self.emit(CrawlEvent::NoSourcemap { script: url }),
            }
        }
        .boxed()
    }

    fn process_map(&self, script: &Url, map: LocatedMap, out_dir: &Path) {
        let label = map.source.to_string();
        if let Err(e) = ensure_output_dir(out_dir) {
            self.emit(CrawlEvent::Failed {
                resource: out_dir.display().to_string(),
                reason: e.to_string(),
            });
            return;
        }

        if self.options.save_raw_map {
            let name = map
                .url()
                .map(|u| url_basename(u, RAW_MAP_FALLBACK))
                .unwrap_or_else(|| RAW_MAP_FALLBACK.to_string());
            let dest = out_dir.join(name);
            if let Err(e) = write_with_parents(&dest, &map.bytes) {
                self.emit(CrawlEvent::Failed {
                    resource: dest.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let doc = match parse_sourcemap(&map.bytes) {
            Ok(doc) => doc,
            Err(e) => {
                self.emit(CrawlEvent::Failed { resource: label, reason: e.to_string() });
                return;
            }
        };

        match extract_all(&doc, out_dir, &self.options.extract, IoPolicy::Report) {
            Ok(summary) => {
                for event in summary.events {
                    match event {
                        ExtractEvent::Written { .. } => {}
                        ExtractEvent::Skipped { source, reason } => {
                            self.emit(CrawlEvent::Skipped { resource: source, reason })
                        }
                        ExtractEvent::Failed { source, reason } => {
                            self.emit(CrawlEvent::Failed { resource: source, reason })
                        }
                    }
                }
                self.emit(CrawlEvent::Written {
                    script: script.clone(),
                    map: label,
                    count: summary.written,
                });
            }
            Err(e) => self.emit(CrawlEvent::Failed { resource: label, reason: e.to_string() }),
        }
    }
}

/// Page crawler: discovers scripts, follows their chunks and recovers their sources.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    strategies: Vec<Arc<dyn ChunkNamingStrategy>>,
    options: CrawlOptions,
}

impl Crawler {
    /// Crawler over HTTP using `options.client`, with the built-in chunk strategy.
    pub fn new(options: CrawlOptions) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&options.client)?;
        Ok(Self::with_fetcher(Arc::new(fetcher), options))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            strategies: vec![Arc::new(ReturnObjectStrategy)],
            options,
        }
    }

    /// Register an additional chunk-naming convention.
    pub fn with_strategy(mut self, strategy: Arc<dyn ChunkNamingStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Crawl `root` with `concurrency` workers and write recovered sources under
    /// `<out_base>/<host>/<script dir>/`.
    ///
    /// Only a failure to fetch the root page (or to create `out_base`) is
    /// fatal. Everything else is reported as an event and counted.
    pub async fn run(&self, root: &Url, out_base: &Path, concurrency: usize) -> Result<CrawlReport, CrawlError> {
        let started_at = Utc::now();
        info!("fetching {}", root);
        let body = self
            .fetcher
            .fetch(root)
            .await
            .map_err(|source| CrawlError::RootFetch { url: root.clone(), source })?;

        let scripts = find_scripts(&String::from_utf8_lossy(&body), root);
        if scripts.is_empty() {
            info!("no external script src found on {}", root);
        }
        ensure_output_dir(out_base).map_err(|source| CrawlError::Io { path: out_base.to_path_buf(), source })?;

        let (events_tx, aggregator) = Aggregator::channel();
        let collector = task::spawn(aggregator.run());

        let worker = Arc::new(Worker {
            fetcher: Arc::clone(&self.fetcher),
            strategies: self.strategies.clone(),
            options: self.options.clone(),
            out_base: out_base.to_path_buf(),
            visited: Mutex::new(HashSet::new()),
            events: events_tx,
        });

        // No more workers than there are scripts to hand out.
        let concurrency = concurrency.clamp(1, scripts.len().max(1));
        let (job_tx, job_rx) = mpsc::channel::<Url>(concurrency * 2);
        let job_rx = Arc::new(AsyncMutex::new(job_rx));

        let mut handles = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let job_rx = Arc::clone(&job_rx);
            let worker = Arc::clone(&worker);
            handles.push(task::spawn(async move {
                loop {
                    let next = {
                        let mut rx = job_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(url) = next else { break };
                    worker.process_script(url, None, 0).await;
                }
            }));
        }

        for url in &scripts {
            let _ = job_tx.send(url.clone()).await;
        }
        drop(job_tx);

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("crawl worker stopped abnormally: {}", e);
            }
        }
        // Last sender goes with the worker state; the aggregator then drains and returns.
        drop(worker);
        let (totals, events) = collector.await.unwrap_or_default();

        Ok(CrawlReport {
            root: root.clone(),
            scripts_discovered: scripts.len(),
            totals,
            events,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Crawl `root_url` over HTTP with the built-in chunk strategy.
pub async fn crawl(
    root_url: &Url,
    out_base: &Path,
    concurrency: usize,
    options: &CrawlOptions,
) -> Result<CrawlReport, CrawlError> {
    Crawler::new(options.clone())?.run(root_url, out_base, concurrency).await
}

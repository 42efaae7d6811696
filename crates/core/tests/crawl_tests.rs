mod common;

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{map_json, FakeFetcher};
use httpmock::prelude::*;
use mapsalvage_core::{crawl, CrawlError, CrawlEvent, CrawlOptions, Crawler, FetchError, Fetcher, SkipReason};
use tempfile::tempdir;
use url::Url;

const PAGE: &str = r#"<html><head>
<script src="/static/js/main.js"></script>
<script src="/static/js/vendor.js"></script>
</head><body>
<script src="/static/js/missing.js"></script>
<script src="/static/js/plain.js"></script>
</body></html>"#;

// Root-relative prefix, so the chunk's own runtime points back at itself.
const RUNTIME: &str = r#"function u(e){return "/static/js/chunks/"+e+"."+{7:"aa"}[e]+".chunk.js"}"#;

fn mount_site(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).header("content-type", "text/html").body(PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/js/main.js");
        then.status(200)
            .body(format!("{}\n//# sourceMappingURL=main.js.map\n", RUNTIME));
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/js/main.js.map");
        then.status(200)
            .body(map_json(&["webpack:///./src/index.ts"], &["export default 1;\n"]));
    });
    let chunk_map = map_json(&["../src/lazy.ts"], &["export const lazy = true;\n"]);
    server.mock(move |when, then| {
        when.method(GET).path("/static/js/chunks/7.aa.chunk.js");
        then.status(200).body(format!(
            "{}\n//# sourceMappingURL=data:application/json;base64,{}\n",
            RUNTIME,
            STANDARD.encode(&chunk_map)
        ));
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/js/vendor.js");
        then.status(200).body("var vendor = 1;");
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/js/vendor.js.map");
        then.status(200).body(map_json(
            &["../node_modules/lib/index.js", "empty.js"],
            &["module.exports = {};\n", ""],
        ));
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/js/plain.js");
        then.status(200).body("console.log('no map');");
    });
}

#[tokio::test]
async fn crawls_scripts_chunks_and_maps() {
    let server = MockServer::start_async().await;
    mount_site(&server);

    let root = Url::parse(&server.base_url()).unwrap();
    let host = root.host_str().unwrap().to_string();
    let dir = tempdir().unwrap();

    let report = crawl(&root, dir.path(), 2, &CrawlOptions::default()).await.unwrap();
    let t = report.totals;

    assert_eq!(report.scripts_discovered, 4);
    assert_eq!(t.scripts_processed, 5);
    assert_eq!(t.chunks_discovered, 1);
    assert_eq!(t.maps_found, 3);
    assert_eq!(t.files_written, 3);
    assert_eq!(t.skipped, 1);
    assert_eq!(t.failures, 1);
    assert_eq!(t.without_sourcemap, 1);

    let js_dir = dir.path().join(&host).join("static/js");
    assert_eq!(fs::read_to_string(js_dir.join("src/index.ts")).unwrap(), "export default 1;\n");
    assert!(js_dir.join("chunks/src/lazy.ts").is_file());
    assert!(js_dir.join("node_modules/lib/index.js").is_file());
    assert!(!js_dir.join("empty.js").exists());
    assert!(!js_dir.join("main.js").exists());

    assert!(report.events.iter().any(|e| matches!(
        e,
        CrawlEvent::NoSourcemap { script } if script.path() == "/static/js/plain.js"
    )));
    assert!(report.started_at <= report.finished_at);
}

#[tokio::test]
async fn saves_raw_scripts_and_maps() {
    let server = MockServer::start_async().await;
    mount_site(&server);

    let root = Url::parse(&server.base_url()).unwrap();
    let host = root.host_str().unwrap().to_string();
    let dir = tempdir().unwrap();
    let options = CrawlOptions { save_raw_script: true, save_raw_map: true, ..CrawlOptions::default() };

    crawl(&root, dir.path(), 1, &options).await.unwrap();

    let js_dir = dir.path().join(&host).join("static/js");
    assert!(js_dir.join("main.js").is_file());
    assert!(js_dir.join("main.js.map").is_file());
    assert!(js_dir.join("vendor.js.map").is_file());
    assert!(js_dir.join("chunks/7.aa.chunk.js").is_file());
    assert!(js_dir.join("chunks/sourcemap.json").is_file());
}

#[tokio::test]
async fn root_failure_is_fatal() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(500);
    });
    let root = Url::parse(&server.base_url()).unwrap();
    let dir = tempdir().unwrap();

    let err = crawl(&root, dir.path(), 2, &CrawlOptions::default()).await.unwrap_err();
    assert!(matches!(err, CrawlError::RootFetch { .. }));
}

#[tokio::test]
async fn chunk_depth_is_capped() {
    let page = "https://x.test/";
    let main = "https://x.test/static/js/main.js";
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with(page, r#"<script src="/static/js/main.js"></script>"#)
            .with(main, RUNTIME),
    );
    let options = CrawlOptions { max_chunk_depth: 0, ..CrawlOptions::default() };
    let dir = tempdir().unwrap();

    let report = Crawler::with_fetcher(fetcher.clone(), options)
        .run(&Url::parse(page).unwrap(), dir.path(), 4)
        .await
        .unwrap();

    assert_eq!(report.totals.chunks_discovered, 0);
    assert!(report.events.contains(&CrawlEvent::Skipped {
        resource: "https://x.test/static/js/chunks/7.aa.chunk.js".into(),
        reason: SkipReason::ChunkDepthExceeded,
    }));
    assert!(!fetcher.calls().iter().any(|c| c.contains("chunk.js")));
}

#[tokio::test]
async fn visited_urls_are_processed_once() {
    let page = "https://x.test/";
    let main = "https://x.test/static/js/main.js";
    let chunk = "https://x.test/static/js/chunks/7.aa.chunk.js";
    // The page also lists the chunk directly.
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with(
                page,
                r#"<script src="/static/js/main.js"></script><script src="/static/js/chunks/7.aa.chunk.js"></script>"#,
            )
            .with(main, RUNTIME)
            .with(chunk, RUNTIME),
    );
    let dir = tempdir().unwrap();

    let report = Crawler::with_fetcher(fetcher.clone(), CrawlOptions::default())
        .run(&Url::parse(page).unwrap(), dir.path(), 3)
        .await
        .unwrap();

    assert_eq!(report.totals.scripts_processed, 2);
    assert_eq!(report.totals.without_sourcemap, 2);
    assert_eq!(fetcher.calls().iter().filter(|c| c.as_str() == chunk).count(), 1);
}

#[tokio::test]
async fn already_visited_chunk_is_not_counted_as_depth_skip() {
    let page = "https://x.test/";
    let main = "https://x.test/static/js/main.js";
    let chunk = "https://x.test/static/js/chunks/7.aa.chunk.js";
    // Chunk listed first so the single worker processes it before main derives it.
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with(
                page,
                r#"<script src="/static/js/chunks/7.aa.chunk.js"></script><script src="/static/js/main.js"></script>"#,
            )
            .with(main, RUNTIME)
            .with(chunk, RUNTIME),
    );
    let options = CrawlOptions { max_chunk_depth: 0, ..CrawlOptions::default() };
    let dir = tempdir().unwrap();

    let report = Crawler::with_fetcher(fetcher, options)
        .run(&Url::parse(page).unwrap(), dir.path(), 1)
        .await
        .unwrap();

    assert_eq!(report.totals.scripts_processed, 2);
    assert_eq!(report.totals.skipped, 0);
}

#[tokio::test]
async fn oversized_concurrency_is_clamped() {
    let page = "https://x.test/";
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with(page, r#"<script src="/one.js"></script>"#)
            .with("https://x.test/one.js", "var one = 1;"),
    );
    let dir = tempdir().unwrap();

    let report = Crawler::with_fetcher(fetcher, CrawlOptions::default())
        .run(&Url::parse(page).unwrap(), dir.path(), usize::MAX / 2)
        .await
        .unwrap();

    assert_eq!(report.totals.scripts_processed, 1);
    assert_eq!(report.totals.without_sourcemap, 1);
}

/// Fetcher that holds every request open briefly and records the peak number in flight.
#[derive(Default)]
struct SlowFetcher {
    responses: HashMap<String, Vec<u8>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Fetcher for SlowFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses.get(url.as_str()).cloned().ok_or(FetchError::HttpStatus(404))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn workers_bound_in_flight_scripts_and_chunks() {
    let page = "https://x.test/";
    let mut html = String::new();
    let mut fetcher = SlowFetcher::default();
    for i in 0..8 {
        html.push_str(&format!(r#"<script src="/static/js/s{}.js"></script>"#, i));
        // The first script pulls in a chunk, which its own worker fetches.
        let body = if i == 0 { RUNTIME.to_string() } else { format!("var s{} = {};", i, i) };
        fetcher.responses.insert(format!("https://x.test/static/js/s{}.js", i), body.into_bytes());
    }
    fetcher.responses.insert(page.to_string(), html.into_bytes());
    fetcher
        .responses
        .insert("https://x.test/static/js/chunks/7.aa.chunk.js".to_string(), b"var lazy = 1;".to_vec());
    let fetcher = Arc::new(fetcher);
    let dir = tempdir().unwrap();

    let report = Crawler::with_fetcher(fetcher.clone(), CrawlOptions::default())
        .run(&Url::parse(page).unwrap(), dir.path(), 2)
        .await
        .unwrap();

    assert_eq!(report.totals.scripts_processed, 9);
    assert_eq!(report.totals.chunks_discovered, 1);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    assert!(fetcher.peak.load(Ordering::SeqCst) >= 1);
}

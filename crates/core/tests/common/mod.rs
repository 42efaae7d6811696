#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mapsalvage_core::{FetchError, Fetcher};
use url::Url;

/// In-memory fetcher that records every URL it is asked for.
#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), body.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::HttpStatus(404))
    }
}

pub fn map_json(sources: &[&str], contents: &[&str]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "version": 3,
        "file": "out.js",
        "sources": sources,
        "sourcesContent": contents,
        "mappings": ""
    }))
    .unwrap()
}

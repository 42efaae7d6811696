use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("invalid proxy url '{0}'")]
    InvalidProxy(String),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

pub const DEFAULT_USER_AGENT: &str = concat!("mapsalvage/", env!("CARGO_PKG_VERSION"));

/// Network settings, built once before any worker starts and only read afterwards.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub proxy: Option<String>,
    pub skip_tls_verify: bool,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            skip_tls_verify: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(25),
        }
    }
}

impl ClientConfig {
    /// Build the shared client. Without an explicit proxy the usual
    /// `HTTP(S)_PROXY` environment variables apply.
    pub fn build_client(&self) -> Result<Client, FetchError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str());

        if let Some(raw) = self.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy_url = Url::parse(raw.trim()).map_err(|_| FetchError::InvalidProxy(raw.to_string()))?;
            log::info!("using proxy {}", proxy_url);
            builder = builder.proxy(Proxy::all(proxy_url)?).http1_only();
        }
        if self.skip_tls_verify {
            log::warn!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(builder.build()?)
    }
}

/// Retrieves the raw bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// [`Fetcher`] over a shared `reqwest` client. No retries: a timeout or a
/// non-2xx status is final for that resource.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        Ok(Self { client: config.build_client()? })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }

        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

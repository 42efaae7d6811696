use httpmock::prelude::*;
use mapsalvage_core::{ClientConfig, FetchError, Fetcher, HttpFetcher};
use url::Url;

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&ClientConfig::default()).unwrap()
}

#[tokio::test]
async fn fetch_success_sends_user_agent() {
    let server = MockServer::start_async().await;
    let m = server.mock(|when, then| {
        when.method(GET).path("/app.js").header("user-agent", "probe/1.0");
        then.status(200).body("console.log('hello');");
    });

    let config = ClientConfig { user_agent: "probe/1.0".into(), ..ClientConfig::default() };
    let fetcher = HttpFetcher::new(&config).unwrap();
    let url = Url::parse(&server.url("/app.js")).unwrap();
    let body = fetcher.fetch(&url).await.unwrap();
    m.assert();
    assert_eq!(body, b"console.log('hello');");
}

#[tokio::test]
async fn fetch_http_error() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(404);
    });
    let url = Url::parse(&server.base_url()).unwrap();
    let err = fetcher().fetch(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus(404)));
}

#[tokio::test]
async fn invalid_scheme() {
    let url = Url::parse("ftp://example.com/a.js").unwrap();
    let err = fetcher().fetch(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedScheme(_)));
}

#[test]
fn invalid_proxy_is_rejected() {
    let config = ClientConfig { proxy: Some("not a url".into()), ..ClientConfig::default() };
    assert!(matches!(HttpFetcher::new(&config), Err(FetchError::InvalidProxy(_))));
}

#[test]
fn proxy_and_insecure_build() {
    let config = ClientConfig {
        proxy: Some("http://127.0.0.1:8080".into()),
        skip_tls_verify: true,
        ..ClientConfig::default()
    };
    assert!(HttpFetcher::new(&config).is_ok());
}

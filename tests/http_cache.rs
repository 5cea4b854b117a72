//! Cache behaviour of the HTTP downloader against a mock server.

use std::path::Path;

use url::Url;
use weblaunch_lib::core::downloader::{Downloader, Fetcher};
use weblaunch_lib::core::error::LauncherError;
use weblaunch_lib::core::http::build_http_client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LONG_AGO: &str = "Mon, 01 Jan 2001 00:00:00 GMT";
const FAR_FUTURE: &str = "Fri, 01 Jan 2100 00:00:00 GMT";

fn downloader() -> Downloader {
    Downloader::new(build_http_client().unwrap())
}

fn jar_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/app/a.jar", server.uri())).unwrap()
}

fn cached_copy(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("a.jar");
    std::fs::write(&path, b"cached").unwrap();
    path
}

#[tokio::test]
async fn downloads_missing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let dest = downloader()
        .fetch_to_dir(&jar_url(&server), dir.path(), false)
        .await
        .unwrap();

    assert_eq!(dest, dir.path().join("a.jar"));
    assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    assert!(!dir.path().join("a.jar.part").exists());
}

#[tokio::test]
async fn older_remote_copy_keeps_cache() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200).insert_header("Last-Modified", LONG_AGO))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let cached = cached_copy(dir.path());

    let dest = downloader()
        .fetch_to_dir(&jar_url(&server), dir.path(), false)
        .await
        .unwrap();

    assert_eq!(dest, cached);
    assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
}

#[tokio::test]
async fn newer_remote_copy_replaces_cache() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200).insert_header("Last-Modified", FAR_FUTURE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    cached_copy(dir.path());

    let dest = downloader()
        .fetch_to_dir(&jar_url(&server), dir.path(), false)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
}

#[tokio::test]
async fn missing_last_modified_forces_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    cached_copy(dir.path());

    let dest = downloader()
        .fetch_to_dir(&jar_url(&server), dir.path(), false)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
}

#[tokio::test]
async fn unreachable_server_uses_cache_only_when_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    cached_copy(dir.path());
    let url = jar_url(&server);

    let dest = downloader()
        .fetch_to_dir(&url, dir.path(), true)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"cached");

    let err = downloader()
        .fetch_to_dir(&url, dir.path(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, LauncherError::DownloadFailed { status: 503, .. }));
}

#[tokio::test]
async fn not_found_is_a_download_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/a.jar"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let err = downloader()
        .fetch_to_dir(&jar_url(&server), dir.path(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
    assert!(!dir.path().join("a.jar").exists());
}

#[tokio::test]
async fn fetch_bytes_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/app.jnlp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<jnlp/>"))
        .mount(&server)
        .await;
    let url = Url::parse(&format!("{}/app/app.jnlp", server.uri())).unwrap();

    let bytes = downloader().fetch_bytes(&url).await.unwrap();

    assert_eq!(bytes, b"<jnlp/>");
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::LAST_MODIFIED;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::error::{LauncherError, LauncherResult};

/// Network seam used by every stage that needs remote bytes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into memory.
    async fn fetch_bytes(&self, url: &Url) -> LauncherResult<Vec<u8>>;

    /// Download `url` into `dir` under its basename, reusing an existing copy
    /// when the server has nothing newer. With `allow_cached`, an existing copy
    /// is also used when the server can't be reached.
    async fn fetch_to_dir(&self, url: &Url, dir: &Path, allow_cached: bool)
        -> LauncherResult<PathBuf>;
}

/// Cache-aware HTTP downloader backed by `reqwest`.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// `Last-Modified` of `url` via HEAD. A missing header counts as "now",
    /// so the cached copy is always refreshed.
    pub async fn last_modified(&self, url: &Url) -> LauncherResult<DateTime<Utc>> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let Some(header) = response.headers().get(LAST_MODIFIED) else {
            return Ok(Utc::now());
        };
        let raw = header.to_str().map_err(|e| LauncherError::Network {
            url: url.to_string(),
            message: format!("invalid Last-Modified header: {e}"),
        })?;
        parse_http_date(raw).ok_or_else(|| LauncherError::Network {
            url: url.to_string(),
            message: format!("unable to parse Last-Modified '{raw}'"),
        })
    }

    async fn get(&self, url: &Url) -> LauncherResult<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Stream the body into `dest` through a `.part` file so an interrupted
    /// download never replaces a good cached copy.
    async fn download_file(&self, url: &Url, dest: &Path) -> LauncherResult<()> {
        let response = self.get(url).await?;
        let partial = partial_path(dest);

        {
            let mut file = tokio::fs::File::create(&partial)
                .await
                .map_err(|e| LauncherError::io(&partial, e))?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| network_error(url, e))?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(&partial, e))?;
            }
            file.flush()
                .await
                .map_err(|e| LauncherError::io(&partial, e))?;
            // file is dropped here, before the rename (matters on Windows)
        }

        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }
}

#[async_trait]
impl Fetcher for Downloader {
    async fn fetch_bytes(&self, url: &Url) -> LauncherResult<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| network_error(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_to_dir(
        &self,
        url: &Url,
        dir: &Path,
        allow_cached: bool,
    ) -> LauncherResult<PathBuf> {
        let dest = dir.join(url_basename(url));

        match tokio::fs::metadata(&dest).await {
            Ok(metadata) => {
                let local_modified: DateTime<Utc> = metadata
                    .modified()
                    .map_err(|e| LauncherError::io(&dest, e))?
                    .into();
                match self.last_modified(url).await {
                    Err(e) if allow_cached => {
                        warn!(
                            "unable to update {} because {}, cached version will be used",
                            url, e
                        );
                        return Ok(dest);
                    }
                    Err(e) => return Err(e),
                    Ok(remote_modified) if remote_modified <= local_modified => {
                        info!(
                            "no newer version for {} found on the network, cached version will be used",
                            url
                        );
                        return Ok(dest);
                    }
                    Ok(_) => {}
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LauncherError::io(&dest, e)),
        }

        self.download_file(url, &dest).await?;
        Ok(dest)
    }
}

/// Last path segment of `url`, used as the on-disk file name.
pub fn url_basename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "index".to_string())
}

/// Basename without its final extension (`natives-linux.jar` → `natives-linux`).
pub fn url_stem(url: &Url) -> String {
    let name = url_basename(url);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn network_error(url: &Url, error: reqwest::Error) -> LauncherError {
    LauncherError::Network {
        url: url.to_string(),
        message: error.to_string(),
    }
}

// In-memory fetcher and verifier used by the pipeline tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::core::downloader::{url_basename, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::CancelFlag;
use crate::core::verifier::{ArchiveVerifier, Certificate, VerifyOutcome};

#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    delays: HashMap<String, u64>,
    default_delay: u64,
    cancel_after: Option<(usize, CancelFlag)>,
    fetched: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for URLs whose basename is `name`.
    pub fn with_body(mut self, name: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(name.to_string(), body.into());
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, name: &str, millis: u64) -> Self {
        self.delays.insert(name.to_string(), millis);
        self
    }

    pub fn with_default_delay(mut self, millis: u64) -> Self {
        self.default_delay = millis;
        self
    }

    /// Trip `flag` once `n` downloads have completed.
    pub fn cancelling_after(mut self, n: usize, flag: CancelFlag) -> Self {
        self.cancel_after = Some((n, flag));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn body_for(&self, name: &str) -> Vec<u8> {
        self.bodies
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.as_bytes().to_vec())
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_bytes(&self, url: &Url) -> LauncherResult<Vec<u8>> {
        let name = url_basename(url);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        if self.failing.contains(&name) {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(self.body_for(&name))
    }

    async fn fetch_to_dir(
        &self,
        url: &Url,
        dir: &Path,
        _allow_cached: bool,
    ) -> LauncherResult<PathBuf> {
        let name = url_basename(url);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        self.fetched.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&name).copied().unwrap_or(self.default_delay);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let result = if self.failing.contains(&name) {
            Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            })
        } else {
            let dest = dir.join(&name);
            std::fs::write(&dest, self.body_for(&name))
                .map(|_| dest.clone())
                .map_err(|e| LauncherError::io(&dest, e))
        };

        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, flag)) = &self.cancel_after {
            if done >= *n {
                flag.cancel();
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub struct FakeVerifier {
    default_cert: Vec<u8>,
    certs: HashMap<String, Vec<u8>>,
    rejecting: HashSet<String>,
    verified: AtomicUsize,
    extracted: AtomicUsize,
}

impl FakeVerifier {
    /// Every archive signed with `cert`.
    pub fn uniform(cert: &str) -> Self {
        Self {
            default_cert: cert.as_bytes().to_vec(),
            certs: HashMap::new(),
            rejecting: HashSet::new(),
            verified: AtomicUsize::new(0),
            extracted: AtomicUsize::new(0),
        }
    }

    pub fn with_certificate(mut self, name: &str, cert: &str) -> Self {
        self.certs.insert(name.to_string(), cert.as_bytes().to_vec());
        self
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejecting.insert(name.to_string());
        self
    }

    pub fn verify_count(&self) -> usize {
        self.verified.load(Ordering::SeqCst)
    }

    pub fn certificate_count(&self) -> usize {
        self.extracted.load(Ordering::SeqCst)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl ArchiveVerifier for FakeVerifier {
    async fn verify(&self, archive: &Path) -> LauncherResult<VerifyOutcome> {
        self.verified.fetch_add(1, Ordering::SeqCst);
        if self.rejecting.contains(&file_name(archive)) {
            return Err(LauncherError::Verification {
                path: archive.to_path_buf(),
                message: "jar is unsigned.".into(),
            });
        }
        Ok(VerifyOutcome::Verified)
    }

    async fn certificate(&self, archive: &Path) -> LauncherResult<Certificate> {
        self.extracted.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .certs
            .get(&file_name(archive))
            .cloned()
            .unwrap_or_else(|| self.default_cert.clone());
        Ok(Certificate::new(bytes))
    }
}

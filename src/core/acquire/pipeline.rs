// ─── Resource Acquisition ───
// Concurrent download + verification of every archive of a launch, with the
// single-signer rule checked once all workers have finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::descriptor::Platform;
use crate::core::downloader::{url_basename, Fetcher};
use crate::core::error::{LauncherError, LauncherResult, ResultExt};
use crate::core::progress::LaunchContext;
use crate::core::verifier::{ArchiveVerifier, Certificate, VerifyOutcome};

/// Ceiling on concurrently processed resources.
pub const MAX_IN_FLIGHT: usize = 3;

/// Archives fetched for one launch, in request order, and their common signer.
#[derive(Debug, Clone, Default)]
pub struct AcquiredArchives {
    pub files: Vec<PathBuf>,
    pub certificate: Option<Certificate>,
}

/// Fetches, verifies and signer-checks archives for one launch attempt.
#[derive(Clone)]
pub struct AcquisitionPipeline {
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) verifier: Arc<dyn ArchiveVerifier>,
    pub(super) ctx: LaunchContext,
    pub(super) platform: Platform,
    pub(super) verification_disabled: bool,
    pub(super) concurrency: usize,
}

impl AcquisitionPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        verifier: Arc<dyn ArchiveVerifier>,
        ctx: LaunchContext,
    ) -> Self {
        Self {
            fetcher,
            verifier,
            ctx,
            platform: Platform::current(),
            verification_disabled: false,
            concurrency: MAX_IN_FLIGHT,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Skip the signer tool. Certificates are still extracted and compared.
    pub fn with_verification_disabled(mut self, disabled: bool) -> Self {
        self.verification_disabled = disabled;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Download every archive in `urls` into `dest`, verify it and extract its
    /// signer certificate.
    ///
    /// All workers run to completion. Afterwards cancellation wins over
    /// errors, the first error in `urls` order wins over the rest, and only
    /// then are certificates compared.
    pub async fn acquire(
        &self,
        urls: &[Url],
        dest: &Path,
        allow_cached: bool,
    ) -> LauncherResult<AcquiredArchives> {
        info!(
            "Starting archive acquisition: {} files, concurrency={}",
            urls.len(),
            self.concurrency
        );
        ensure_dir(dest).await?;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let worker = self.clone();
                let semaphore = semaphore.clone();
                let dest = dest.to_path_buf();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| LauncherError::Other(format!("semaphore closed: {e}")))?;
                    worker.acquire_one(&url, &dest, allow_cached).await
                })
            })
            .collect();

        let results = join_all(handles).await;

        if self.ctx.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }
        self.ctx.progress.send_text("Downloading finished");

        let mut acquired = Vec::with_capacity(results.len());
        for result in results {
            let outcome = result.map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?;
            match outcome? {
                Some(item) => acquired.push(item),
                // A worker only stops early after seeing cancellation.
                None => return Err(LauncherError::Cancelled),
            }
        }

        let certificate = ensure_single_signer(&acquired)?;
        if let Some(cert) = &certificate {
            info!(
                "{} archives signed by certificate {}",
                acquired.len(),
                cert.fingerprint()
            );
        }

        Ok(AcquiredArchives {
            files: acquired.into_iter().map(|(path, _)| path).collect(),
            certificate,
        })
    }

    /// One worker: download, verify, extract certificate, with a cancellation
    /// checkpoint before each stage. `None` means the worker saw cancellation.
    async fn acquire_one(
        &self,
        url: &Url,
        dest: &Path,
        allow_cached: bool,
    ) -> LauncherResult<Option<(PathBuf, Certificate)>> {
        let name = url_basename(url);
        let progress = &self.ctx.progress;

        if self.ctx.is_cancelled() {
            return Ok(None);
        }
        debug!("downloading JAR {}", url);
        progress.send_text(&format!("Downloading JAR {name}"));
        let path = self
            .fetcher
            .fetch_to_dir(url, dest, allow_cached)
            .await
            .with_context(|| format!("downloading {url}"))?;
        progress.step_progress();
        progress.send_text(&format!("Downloading JAR {name} finished"));

        if self.ctx.is_cancelled() {
            return Ok(None);
        }
        self.verify(&path, &name).await?;
        progress.step_progress();

        if self.ctx.is_cancelled() {
            return Ok(None);
        }
        let certificate = self
            .verifier
            .certificate(&path)
            .await
            .with_context(|| format!("JAR certificate error {name}"))?;
        progress.step_progress();

        Ok(Some((path, certificate)))
    }

    pub(super) async fn verify(&self, path: &Path, name: &str) -> LauncherResult<()> {
        if self.verification_disabled {
            debug!("verification disabled, not checking {}", name);
            return Ok(());
        }
        match self
            .verifier
            .verify(path)
            .await
            .with_context(|| format!("JAR verification failed {name}"))?
        {
            VerifyOutcome::Verified => {
                self.ctx
                    .progress
                    .send_text(&format!("Checking JAR {name} finished"));
            }
            VerifyOutcome::Skipped => warn!("JAR {} was not verified: no signer tool", name),
        }
        Ok(())
    }
}

/// Every archive of a launch must carry the same certificate bytes.
fn ensure_single_signer(
    acquired: &[(PathBuf, Certificate)],
) -> LauncherResult<Option<Certificate>> {
    let Some((_, first)) = acquired.first() else {
        return Ok(None);
    };
    if let Some((path, _)) = acquired.iter().find(|(_, cert)| cert != first) {
        return Err(LauncherError::SignerMismatch { path: path.clone() });
    }
    Ok(Some(first.clone()))
}

pub(super) async fn ensure_dir(dir: &Path) -> LauncherResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acquire::testing::{FakeFetcher, FakeVerifier};
    use crate::core::progress::{CancelFlag, HeadlessProgress};

    fn urls(names: &[&str]) -> Vec<Url> {
        names
            .iter()
            .map(|n| Url::parse(&format!("http://example.com/app/{n}")).unwrap())
            .collect()
    }

    fn pipeline(
        fetcher: Arc<FakeFetcher>,
        verifier: Arc<FakeVerifier>,
        progress: Arc<HeadlessProgress>,
        cancel: CancelFlag,
    ) -> AcquisitionPipeline {
        AcquisitionPipeline::new(fetcher, verifier, LaunchContext::new(progress, cancel))
    }

    #[tokio::test]
    async fn same_signer_everywhere_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        let verifier = Arc::new(FakeVerifier::uniform("C"));
        let progress = Arc::new(HeadlessProgress::new());
        let pipeline = pipeline(fetcher.clone(), verifier, progress.clone(), CancelFlag::new());

        let acquired = pipeline
            .acquire(&urls(&["a.jar", "b.jar", "c.jar"]), dir.path(), false)
            .await
            .unwrap();

        assert_eq!(acquired.files.len(), 3);
        assert!(acquired.files[0].ends_with("a.jar"));
        assert!(acquired.files[2].ends_with("c.jar"));
        assert_eq!(acquired.certificate.unwrap().as_bytes(), b"C");
        assert_eq!(progress.steps(), 9);
    }

    #[tokio::test]
    async fn different_signer_fails_regardless_of_completion_order() {
        for slow in ["a.jar", "b.jar", "c.jar"] {
            let dir = tempfile::tempdir().unwrap();
            let fetcher = Arc::new(FakeFetcher::new().with_delay(slow, 30));
            let verifier = Arc::new(FakeVerifier::uniform("C").with_certificate("c.jar", "D"));
            let pipeline = pipeline(
                fetcher,
                verifier,
                Arc::new(HeadlessProgress::new()),
                CancelFlag::new(),
            );

            let err = pipeline
                .acquire(&urls(&["a.jar", "b.jar", "c.jar"]), dir.path(), false)
                .await
                .unwrap_err();
            assert!(matches!(err, LauncherError::SignerMismatch { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn at_most_three_workers_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new().with_default_delay(20));
        let verifier = Arc::new(FakeVerifier::uniform("C"));
        let pipeline = pipeline(
            fetcher.clone(),
            verifier,
            Arc::new(HeadlessProgress::new()),
            CancelFlag::new(),
        );
        let names: Vec<String> = (0..10).map(|i| format!("lib{i}.jar")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        pipeline.acquire(&urls(&names), dir.path(), false).await.unwrap();

        assert_eq!(fetcher.fetch_count(), 10);
        assert_eq!(fetcher.max_in_flight(), MAX_IN_FLIGHT);
    }

    #[tokio::test]
    async fn first_error_in_request_order_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // b fails late, c fails early; b still comes first in request order.
        let fetcher = Arc::new(
            FakeFetcher::new()
                .failing("b.jar")
                .with_delay("b.jar", 40)
                .failing("c.jar"),
        );
        let verifier = Arc::new(FakeVerifier::uniform("C"));
        let pipeline = pipeline(
            fetcher.clone(),
            verifier,
            Arc::new(HeadlessProgress::new()),
            CancelFlag::new(),
        );

        let err = pipeline
            .acquire(&urls(&["a.jar", "b.jar", "c.jar", "d.jar"]), dir.path(), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("b.jar"), "{err}");
        // Siblings were not cancelled by the failures.
        assert_eq!(fetcher.fetch_count(), 4);
    }

    #[tokio::test]
    async fn verifier_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Arc::new(FakeVerifier::uniform("C").rejecting("a.jar"));
        let pipeline = pipeline(
            Arc::new(FakeFetcher::new()),
            verifier,
            Arc::new(HeadlessProgress::new()),
            CancelFlag::new(),
        );

        let err = pipeline
            .acquire(&urls(&["a.jar"]), dir.path(), false)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), LauncherError::Verification { .. }));
    }

    #[tokio::test]
    async fn disabled_verification_still_compares_signers() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Arc::new(
            FakeVerifier::uniform("C")
                .rejecting("a.jar")
                .with_certificate("b.jar", "D"),
        );
        let progress = Arc::new(HeadlessProgress::new());
        let pipeline = pipeline(
            Arc::new(FakeFetcher::new()),
            verifier.clone(),
            progress.clone(),
            CancelFlag::new(),
        )
        .with_verification_disabled(true);

        let err = pipeline
            .acquire(&urls(&["a.jar", "b.jar"]), dir.path(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::SignerMismatch { .. }));
        assert_eq!(verifier.verify_count(), 0);
        assert_eq!(progress.steps(), 6);
    }

    #[tokio::test]
    async fn cancellation_mid_batch_keeps_completed_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelFlag::new();
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_default_delay(10)
                .cancelling_after(2, cancel.clone()),
        );
        let pipeline = pipeline(
            fetcher.clone(),
            Arc::new(FakeVerifier::uniform("C")),
            Arc::new(HeadlessProgress::new()),
            cancel,
        );

        let err = pipeline
            .acquire(
                &urls(&["a.jar", "b.jar", "c.jar", "d.jar", "e.jar"]),
                dir.path(),
                false,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(fetcher.fetch_count() < 5);
        let on_disk = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(on_disk, fetcher.fetch_count());
        assert!(on_disk >= 2);
    }

    #[tokio::test]
    async fn empty_batch_has_no_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            Arc::new(FakeFetcher::new()),
            Arc::new(FakeVerifier::uniform("C")),
            Arc::new(HeadlessProgress::new()),
            CancelFlag::new(),
        );
        let acquired = pipeline.acquire(&[], dir.path(), false).await.unwrap();
        assert!(acquired.files.is_empty());
        assert!(acquired.certificate.is_none());
    }
}

// ─── Extension Resolution ───
// Pulls each referenced sub-descriptor, then fetches and checks its jars in
// the same trust domain as the main application. Extensions may list further
// extensions; each descriptor URL is visited once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures_util::future::{join_all, BoxFuture};
use tokio::sync::Semaphore;
use tracing::{debug, info};
use url::Url;

use super::pipeline::{ensure_dir, AcquisitionPipeline};
use crate::core::descriptor::{Descriptor, ResolvedExtension};
use crate::core::downloader::url_basename;
use crate::core::error::{LauncherError, LauncherResult, ResultExt};
use crate::core::verifier::Certificate;

/// Extension descriptors live apart from the jars so they can never replace
/// the saved application descriptor.
pub const EXTENSIONS_DIR: &str = "extensions";

type ExtensionJars = Vec<(PathBuf, Certificate)>;
type Visited = Arc<Mutex<HashSet<Url>>>;

impl AcquisitionPipeline {
    /// Fetch every extension descriptor, recursively, and the jars it lists
    /// into `dest`.
    ///
    /// Each jar's signer must equal `expected` (the certificate of the main
    /// archives). Without one, extension jars must at least agree with each
    /// other. Returns jar paths in extension order, nested extensions right
    /// after the extension that lists them.
    pub async fn acquire_extensions(
        &self,
        extensions: &[ResolvedExtension],
        dest: &Path,
        allow_cached: bool,
        expected: Option<&Certificate>,
    ) -> LauncherResult<Vec<PathBuf>> {
        if extensions.is_empty() {
            return Ok(Vec::new());
        }
        info!("Resolving {} extension(s)", extensions.len());
        ensure_dir(dest).await?;
        ensure_dir(&dest.join(EXTENSIONS_DIR)).await?;

        let visited: Visited = Arc::new(Mutex::new(HashSet::new()));
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = extensions
            .iter()
            .cloned()
            .map(|extension| {
                let worker = self.clone();
                let semaphore = semaphore.clone();
                let dest = dest.to_path_buf();
                let visited = visited.clone();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| LauncherError::Other(format!("semaphore closed: {e}")))?;
                    worker
                        .acquire_extension(&extension, &dest, allow_cached, visited)
                        .await
                })
            })
            .collect();

        let results = join_all(handles).await;

        if self.ctx.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }

        let mut jars: ExtensionJars = Vec::new();
        for result in results {
            let outcome =
                result.map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?;
            match outcome? {
                Some(found) => jars.extend(found),
                None => return Err(LauncherError::Cancelled),
            }
        }

        let reference = expected.cloned().or_else(|| jars.first().map(|(_, c)| c.clone()));
        if let Some(reference) = reference {
            if let Some((path, _)) = jars.iter().find(|(_, cert)| *cert != reference) {
                return Err(LauncherError::SignerMismatch { path: path.clone() });
            }
        }

        Ok(jars.into_iter().map(|(path, _)| path).collect())
    }

    /// One extension and everything below it. `None` means cancellation was
    /// seen.
    fn acquire_extension<'a>(
        &'a self,
        extension: &'a ResolvedExtension,
        dest: &'a Path,
        allow_cached: bool,
        visited: Visited,
    ) -> BoxFuture<'a, LauncherResult<Option<ExtensionJars>>> {
        Box::pin(async move {
            let progress = &self.ctx.progress;
            if self.ctx.is_cancelled() {
                return Ok(None);
            }
            if !first_visit(&visited, &extension.url) {
                debug!("extension {} already resolved", extension.url);
                return Ok(Some(Vec::new()));
            }

            progress.send_text(&format!("Downloading extension {}", extension.name));
            let descriptor_path = self
                .fetcher
                .fetch_to_dir(&extension.url, &dest.join(EXTENSIONS_DIR), allow_cached)
                .await
                .with_context(|| format!("downloading extension {}", extension.href))?;
            let bytes = tokio::fs::read(&descriptor_path)
                .await
                .map_err(|e| LauncherError::io(&descriptor_path, e))?;
            let descriptor = Descriptor::parse(&bytes)
                .with_context(|| format!("parsing extension {}", extension.href))?;
            let resolved = descriptor
                .resolve_resources(&self.platform)
                .with_context(|| format!("resolving extension {}", extension.href))?;
            debug!(
                "extension {} lists {} jar(s) and {} extension(s)",
                extension.name,
                resolved.jars.len(),
                resolved.extensions.len()
            );

            let mut jars = Vec::with_capacity(resolved.jars.len());
            for url in &resolved.jars {
                if self.ctx.is_cancelled() {
                    return Ok(None);
                }
                let name = url_basename(url);
                let path = self
                    .fetcher
                    .fetch_to_dir(url, dest, allow_cached)
                    .await
                    .with_context(|| format!("downloading {url}"))?;

                if self.ctx.is_cancelled() {
                    return Ok(None);
                }
                self.verify(&path, &name).await?;

                if self.ctx.is_cancelled() {
                    return Ok(None);
                }
                let certificate = self
                    .verifier
                    .certificate(&path)
                    .await
                    .with_context(|| format!("JAR certificate error {name}"))?;
                jars.push((path, certificate));
            }

            progress.step_progress();
            progress.send_text(&format!("Downloading extension {} finished", extension.name));

            for nested in &resolved.extensions {
                match self
                    .acquire_extension(nested, dest, allow_cached, visited.clone())
                    .await?
                {
                    Some(found) => jars.extend(found),
                    None => return Ok(None),
                }
            }
            Ok(Some(jars))
        })
    }
}

/// Record `url` as seen; false when it already was.
fn first_visit(visited: &Mutex<HashSet<Url>>, url: &Url) -> bool {
    let mut seen = visited
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    seen.insert(url.clone())
}

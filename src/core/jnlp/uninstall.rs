use std::path::Path;

use tracing::{info, warn};

use super::launcher::{parse_url, JnlpLauncher};
use crate::core::descriptor::{normalize_url, Descriptor};
use crate::core::error::{LauncherError, LauncherResult, ResultExt};
use crate::core::progress::LaunchContext;
use crate::core::store::{directory_for, remove_resource_dir};

impl JnlpLauncher {
    /// Uninstall using a descriptor on disk, usually the saved `original.jnlp`.
    pub async fn uninstall_by_filename(&self, path: &Path, ctx: &LaunchContext) -> LauncherResult<()> {
        info!("uninstall using filename {:?}", path);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        self.uninstall(&bytes, ctx).await
    }

    pub async fn uninstall_by_url(&self, url: &str, ctx: &LaunchContext) -> LauncherResult<()> {
        info!("uninstall using URL {}", url);
        let url = parse_url(&normalize_url(url))?;
        let bytes = self
            .fetcher
            .fetch_bytes(&url)
            .await
            .with_context(|| format!("downloading {url}"))?;
        self.uninstall(&bytes, ctx).await
    }

    /// Only an unreadable descriptor stops the uninstall. Every cleanup step
    /// runs even when an earlier one failed.
    async fn uninstall(&self, bytes: &[u8], ctx: &LaunchContext) -> LauncherResult<()> {
        let descriptor = Descriptor::parse(bytes).context("parsing JNLP")?;
        ctx.progress.set_title(descriptor.title());
        ctx.progress
            .send_text(&format!("Uninstalling {}", descriptor.title()));

        self.remove_shortcuts(&descriptor);

        let title = descriptor.title();
        if !title.is_empty() {
            if let Err(e) = self.integration.deregister_installed_app(title) {
                warn!("unable to uninstall app from control panel: {}", e);
            }
        }

        remove_resource_dir(&directory_for(&self.work_dir, bytes)).await;
        ctx.progress.send_text("Uninstall finished");
        ctx.progress.close();
        Ok(())
    }
}

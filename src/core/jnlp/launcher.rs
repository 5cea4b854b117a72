// ─── JNLP Launcher ───
// Drives one launch attempt from descriptor bytes to a running Java process.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use super::state::LaunchState;
use crate::core::acquire::AcquisitionPipeline;
use crate::core::descriptor::{
    normalize_url, resolve_href, Descriptor, Icon, Platform, ResolvedResources,
};
use crate::core::downloader::{url_basename, Fetcher};
use crate::core::error::{LauncherError, LauncherResult, ResultExt};
use crate::core::integration::{
    AppInfo, DesktopIntegration, LoggingIntegration, ShortcutId, ShortcutLocation, ShortcutSpec,
};
use crate::core::java::{check_required_versions, JavaRuntime};
use crate::core::launch::{
    extract_natives, path_str, JavaSpawner, LaunchPlan, ProcessSpawner, SpawnOptions,
};
use crate::core::progress::LaunchContext;
use crate::core::state::LauncherSettings;
use crate::core::store::{check_for_update, directory_for, save_original};
use crate::core::verifier::{ArchiveVerifier, JarSigner};

/// Title of the progress window.
pub const PRODUCT_TITLE: &str = "WebLaunch";

/// Per-invocation choices made on the command line or by the browser.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// `-javadir`; carried into shortcut arguments.
    pub java_dir: Option<PathBuf>,
    pub show_console: bool,
    /// Invoked through native messaging; the child is detached.
    pub from_browser: bool,
}

#[derive(Debug, Clone)]
pub(super) struct DownloadedIcon {
    pub icon: Icon,
    pub path: PathBuf,
}

pub struct JnlpLauncher {
    pub(super) work_dir: PathBuf,
    settings: LauncherSettings,
    options: LaunchOptions,
    pub(super) fetcher: Arc<dyn Fetcher>,
    verifier: Option<Arc<dyn ArchiveVerifier>>,
    pub(super) integration: Arc<dyn DesktopIntegration>,
    spawner: Arc<dyn ProcessSpawner>,
    platform: Platform,
    executable: PathBuf,
    state: Mutex<LaunchState>,
}

impl JnlpLauncher {
    pub fn new(
        work_dir: PathBuf,
        settings: LauncherSettings,
        options: LaunchOptions,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let executable = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("weblaunch"));
        Self {
            work_dir,
            settings,
            options,
            fetcher,
            verifier: None,
            integration: Arc::new(LoggingIntegration),
            spawner: Arc::new(JavaSpawner),
            platform: Platform::current(),
            executable,
            state: Mutex::new(LaunchState::default()),
        }
    }

    pub fn with_integration(mut self, integration: Arc<dyn DesktopIntegration>) -> Self {
        self.integration = integration;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Replace the `jarsigner` verifier derived from the runtime.
    pub fn with_verifier(mut self, verifier: Arc<dyn ArchiveVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = executable;
        self
    }

    pub fn state(&self) -> LaunchState {
        self.state.lock().map(|s| *s).unwrap_or(LaunchState::Failed)
    }

    fn set_state(&self, next: LaunchState) {
        if let Ok(mut state) = self.state.lock() {
            debug!("launch state {} -> {}", *state, next);
            *state = next;
        }
    }

    /// Download the descriptor behind `url` and launch it. Returns the pid.
    pub async fn run_by_url(
        &self,
        url: &str,
        runtime: &JavaRuntime,
        ctx: &LaunchContext,
    ) -> LauncherResult<u32> {
        info!("Processing {}", url);
        ctx.progress.start(PRODUCT_TITLE);
        let result: LauncherResult<u32> = async {
            self.set_state(LaunchState::Fetching);
            let url = parse_url(&normalize_url(url))?;
            let bytes = self
                .fetcher
                .fetch_bytes(&url)
                .await
                .with_context(|| format!("downloading {url}"))?;
            self.run(bytes, None, runtime, ctx).await
        }
        .await;
        self.finish(result, ctx)
    }

    /// Launch a descriptor stored on disk, after checking its `href` for a
    /// newer copy.
    pub async fn run_by_filename(
        &self,
        path: &Path,
        runtime: &JavaRuntime,
        ctx: &LaunchContext,
    ) -> LauncherResult<u32> {
        info!("Processing {:?}", path);
        ctx.progress.start(PRODUCT_TITLE);
        let result: LauncherResult<u32> = async {
            self.set_state(LaunchState::Fetching);
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| LauncherError::io(path, e))?;
            let update = check_for_update(self.fetcher.as_ref(), bytes).await?;
            self.run(update.bytes, update.previous, runtime, ctx).await
        }
        .await;
        self.finish(result, ctx)
    }

    /// The one place a launch outcome is logged and shown to the user.
    fn finish(&self, result: LauncherResult<u32>, ctx: &LaunchContext) -> LauncherResult<u32> {
        match &result {
            Ok(pid) => {
                info!("application is running (pid {})", pid);
                ctx.progress.close();
            }
            Err(e) if e.is_cancelled() => {
                self.set_state(LaunchState::Cancelled);
                info!("launch cancelled by user");
            }
            Err(e) => {
                self.set_state(LaunchState::Failed);
                error!("{}", e);
                ctx.progress.send_error(&e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        bytes: Vec<u8>,
        previous: Option<Descriptor>,
        runtime: &JavaRuntime,
        ctx: &LaunchContext,
    ) -> LauncherResult<u32> {
        self.set_state(LaunchState::Parsing);
        let descriptor = Descriptor::parse(&bytes).context("parsing JNLP")?;
        let resource_dir = directory_for(&self.work_dir, &bytes);
        ctx.progress.set_title(descriptor.title());
        let original = save_original(&resource_dir, &bytes)
            .await
            .context("unable to save original jnlp file")?;

        self.set_state(LaunchState::ResolvingPlatform);
        let resolved = descriptor.resolve_resources(&self.platform)?;
        let mut plan = LaunchPlan::for_descriptor(runtime.java.clone(), &descriptor)
            .context("unable to run java application")?;
        ctx.progress.set_progress_max(progress_max(&resolved));
        check_required_versions(&resolved.java_versions, &runtime.version)?;

        let allow_cached = descriptor.is_offline_allowed();
        let verifier = self
            .verifier
            .clone()
            .unwrap_or_else(|| Arc::new(JarSigner::new(runtime.jarsigner.clone())));
        let pipeline = AcquisitionPipeline::new(self.fetcher.clone(), verifier, ctx.clone())
            .with_platform(self.platform.clone())
            .with_verification_disabled(self.settings.disable_verification);
        info!(
            "DisableVerification is {}",
            self.settings.disable_verification
        );

        self.set_state(LaunchState::AcquiringResources);
        let acquired = pipeline
            .acquire(&resolved.archives(), &resource_dir, allow_cached)
            .await?;
        let split = resolved.jars.len().min(acquired.files.len());
        let (jars, native_archives) = acquired.files.split_at(split);

        self.set_state(LaunchState::ExtractingNatives);
        let native_dirs = extract_natives(native_archives, ctx).await?;

        self.set_state(LaunchState::AcquiringExtensions);
        ctx.progress.send_text("Downloading extensions...");
        let extension_jars = pipeline
            .acquire_extensions(
                &resolved.extensions,
                &resource_dir,
                allow_cached,
                acquired.certificate.as_ref(),
            )
            .await?;
        let icons = self.download_icons(&descriptor, &resource_dir, ctx).await?;

        self.set_state(LaunchState::UpdatingShortcuts);
        if let Some(previous) = &previous {
            self.remove_shortcuts(previous);
        }
        self.create_shortcuts(&descriptor, &icons, &original, ctx)?;
        if self.settings.add_app_to_control_panel {
            self.install_app(&descriptor, &icons, &original)?;
        }

        if ctx.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }
        self.set_state(LaunchState::Launching);
        ctx.progress.send_text("Starting application...");

        plan.jvm_args = resolved.jvm_args;
        plan.classpath = jars.iter().cloned().chain(extension_jars).collect();
        plan.properties = resolved.properties;
        plan.native_dirs = native_dirs;
        plan.splash = icons
            .iter()
            .find(|downloaded| downloaded.icon.is_splash())
            .map(|downloaded| downloaded.path.clone());
        info!("java arguments {}", plan.args().join(" "));

        let options = SpawnOptions {
            detached: self.options.from_browser,
        };
        let pid = self.spawner.spawn(&plan, options, ctx)?;
        self.set_state(LaunchState::Running);
        Ok(pid)
    }

    /// Icons are optional: failures are reported and skipped. The whole stage
    /// is one progress step.
    async fn download_icons(
        &self,
        descriptor: &Descriptor,
        dir: &Path,
        ctx: &LaunchContext,
    ) -> LauncherResult<Vec<DownloadedIcon>> {
        let base = descriptor.base_url()?;
        let mut downloaded = Vec::new();

        for icon in descriptor.icons() {
            if ctx.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }
            let url = match resolve_href(base.as_ref(), &icon.href) {
                Ok(url) => url,
                Err(e) => {
                    warn!("unable to parse icon href {}: {}", icon.href, e);
                    continue;
                }
            };
            let name = url_basename(&url);
            ctx.progress.send_text(&format!("Downloading {name}"));
            match self.fetcher.fetch_to_dir(&url, dir, true).await {
                Ok(path) => {
                    ctx.progress.send_text(&format!("Downloading {name} finished"));
                    downloaded.push(DownloadedIcon {
                        icon: icon.clone(),
                        path,
                    });
                }
                Err(e) => {
                    warn!("unable to download icon {}: {}", icon.href, e);
                    ctx.progress
                        .send_text(&format!("Warning: unable to download {name}"));
                }
            }
        }

        ctx.progress.step_progress();
        Ok(downloaded)
    }

    fn create_shortcuts(
        &self,
        descriptor: &Descriptor,
        icons: &[DownloadedIcon],
        original: &Path,
        ctx: &LaunchContext,
    ) -> LauncherResult<()> {
        let Some(info) = descriptor.information() else {
            return Ok(());
        };
        let shortcut = |location| ShortcutSpec {
            location,
            title: info.title.clone(),
            description: info.shortcut_description().to_string(),
            icon: shortcut_icon(icons),
            target: self.executable.clone(),
            arguments: self.shortcut_arguments(original),
        };

        if info.wants_desktop_shortcut() {
            ctx.progress.send_text("Creating Desktop shortcut");
            self.integration
                .create_shortcut(&shortcut(ShortcutLocation::Desktop))
                .context("creating desktop shortcut")?;
        }
        if info.menu_preference().is_some() {
            ctx.progress.send_text("Creating Start Menu shortcut");
            let location = ShortcutLocation::Menu {
                submenu: info.submenu().to_string(),
            };
            self.integration
                .create_shortcut(&shortcut(location))
                .context("creating menu shortcut")?;
        }
        Ok(())
    }

    /// Remove the shortcuts a descriptor asked for. Runs without a progress
    /// surface; failures are only logged.
    pub(super) fn remove_shortcuts(&self, descriptor: &Descriptor) {
        let Some(info) = descriptor.information() else {
            return;
        };
        if info.wants_desktop_shortcut() {
            info!("removing old desktop shortcut: {}", info.title);
            let id = ShortcutId::Desktop {
                title: info.title.clone(),
            };
            if let Err(e) = self.integration.remove_shortcut(&id) {
                warn!("error while removing old desktop shortcut: {}", e);
            }
        }
        if info.menu_preference().is_some() {
            info!("removing old start menu shortcut: {}", info.title);
            let id = ShortcutId::Menu {
                submenu: info.submenu().to_string(),
                title: info.title.clone(),
            };
            if let Err(e) = self.integration.remove_shortcut(&id) {
                warn!("error while removing old start menu shortcut: {}", e);
            }
        }
    }

    fn install_app(
        &self,
        descriptor: &Descriptor,
        icons: &[DownloadedIcon],
        original: &Path,
    ) -> LauncherResult<()> {
        let Some(info) = descriptor.information() else {
            return Ok(());
        };
        let app = AppInfo {
            title: info.title.clone(),
            uninstall_command: format!(
                "{} -uninstall -gui {}",
                path_str(&self.executable),
                path_str(original)
            ),
            icon: shortcut_icon(icons),
            version: info.version.clone().unwrap_or_default(),
            url: info
                .homepage
                .as_ref()
                .map(|h| h.href.clone())
                .unwrap_or_default(),
            publisher: info.vendor.clone(),
        };
        info!("adding app into Control Panel");
        self.integration
            .register_installed_app(&app)
            .context("unable to install app into control panel")
    }

    fn shortcut_arguments(&self, original: &Path) -> Vec<String> {
        let mut arguments = Vec::new();
        if let Some(dir) = &self.options.java_dir {
            arguments.push("-javadir".to_string());
            arguments.push(path_str(dir));
        }
        if self.options.show_console {
            arguments.push("-showconsole".to_string());
        }
        arguments.push(path_str(original));
        arguments
    }
}

/// Three steps per archive, one per extension, one for the icons.
pub fn progress_max(resolved: &ResolvedResources) -> usize {
    3 * (resolved.jars.len() + resolved.native_libs.len()) + resolved.extensions.len() + 1
}

/// First downloaded `.ico` of a shortcut-compatible kind.
fn shortcut_icon(icons: &[DownloadedIcon]) -> Option<PathBuf> {
    icons
        .iter()
        .filter(|downloaded| downloaded.icon.is_shortcut_kind())
        .find(|downloaded| {
            downloaded
                .path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ico"))
        })
        .map(|downloaded| downloaded.path.clone())
}

pub(super) fn parse_url(raw: &str) -> LauncherResult<url::Url> {
    url::Url::parse(raw).map_err(|source| LauncherError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

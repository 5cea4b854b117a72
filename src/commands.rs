use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::core::downloader::{Downloader, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::integration::platform_integration;
use crate::core::java::{check_platform, JavaRuntime, RuntimeLocation};
use crate::core::jnlp::{JnlpLauncher, LaunchOptions};
use crate::core::messaging::{listen, LaunchRequestHandler};
use crate::core::progress::{CancelFlag, ConsoleProgress, HeadlessProgress, LaunchContext};
use crate::core::registry::Registry;
use crate::core::state::LauncherSettings;

/// Everything a command needs that is fixed for the whole process.
pub struct Environment {
    pub work_dir: PathBuf,
    pub settings: LauncherSettings,
}

type Handlers = Registry<Arc<JnlpLauncher>>;

fn build_launcher(env: &Environment, options: LaunchOptions) -> LauncherResult<Arc<JnlpLauncher>> {
    let client = build_http_client()?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(Downloader::new(client));
    let launcher = JnlpLauncher::new(env.work_dir.clone(), env.settings.clone(), options, fetcher)
        .with_integration(Arc::from(platform_integration()));
    Ok(Arc::new(launcher))
}

/// `jnlp`/`jnlps` URLs and `.jnlp` files (local or over HTTP) all go to the
/// same launcher.
fn build_registry(launcher: Arc<JnlpLauncher>) -> Handlers {
    let mut registry = Registry::new();
    registry
        .register_scheme("jnlp", launcher.clone())
        .register_scheme("jnlps", launcher.clone())
        .register_extension("jnlp", launcher);
    registry
}

/// `-javadir` on the command line wins over the settings file.
async fn precheck(
    env: &Environment,
    java_dir: Option<&Path>,
    show_console: bool,
) -> LauncherResult<JavaRuntime> {
    let java_dir = java_dir.or(env.settings.java_dir.as_deref());
    let location = RuntimeLocation::resolve(java_dir, show_console)?;
    check_platform(&location).await
}

/// Ctrl-C asks the running launch to stop at its next checkpoint.
fn cancel_on_interrupt(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

pub async fn launch(
    env: &Environment,
    target: &str,
    java_dir: Option<PathBuf>,
    show_console: bool,
) -> ExitCode {
    let progress = Arc::new(ConsoleProgress::new());
    let cancel = CancelFlag::new();
    cancel_on_interrupt(cancel.clone());
    let ctx = LaunchContext::new(progress, cancel);

    let runtime = match precheck(env, java_dir.as_deref(), show_console).await {
        Ok(runtime) => runtime,
        Err(e) => return report(&ctx, e),
    };

    let options = LaunchOptions {
        java_dir,
        show_console,
        from_browser: false,
    };
    let launcher = match build_launcher(env, options) {
        Ok(launcher) => launcher,
        Err(e) => return report(&ctx, e),
    };
    let registry = build_registry(launcher);

    let resolved = match registry.resolve(target) {
        Ok(resolved) => resolved,
        Err(e) => return report(&ctx, e),
    };
    // The launcher reports its own failures to the progress surface.
    let result = if resolved.by_url {
        resolved.handler.run_by_url(target, &runtime, &ctx).await
    } else {
        resolved
            .handler
            .run_by_filename(Path::new(target), &runtime, &ctx)
            .await
    };
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

pub async fn uninstall(env: &Environment, target: &str, gui: bool) -> ExitCode {
    let ctx = if gui {
        LaunchContext::new(Arc::new(ConsoleProgress::new()), CancelFlag::new())
    } else {
        LaunchContext::headless()
    };
    let launcher = match build_launcher(env, LaunchOptions::default()) {
        Ok(launcher) => launcher,
        Err(e) => return report(&ctx, e),
    };
    let registry = build_registry(launcher);

    let result = match registry.resolve(target) {
        Ok(resolved) if resolved.by_url => resolved.handler.uninstall_by_url(target, &ctx).await,
        Ok(resolved) => {
            resolved
                .handler
                .uninstall_by_filename(Path::new(target), &ctx)
                .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            info!("uninstall of {} finished", target);
            ExitCode::SUCCESS
        }
        Err(e) => report(&ctx, e),
    }
}

/// Browser-facing mode: requests on stdin, responses on stdout.
pub async fn native_messaging(
    env: &Environment,
    java_dir: Option<PathBuf>,
    show_console: bool,
) -> ExitCode {
    let handler = BrowserRequests {
        runtime: precheck(env, java_dir.as_deref(), show_console).await,
        registry: build_launcher(
            env,
            LaunchOptions {
                java_dir,
                show_console,
                from_browser: true,
            },
        )
        .map(build_registry),
    };

    match listen(tokio::io::stdin(), tokio::io::stdout(), &handler).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("native messaging failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Status probes are answered even when the runtime precheck failed; only
/// launches report it.
struct BrowserRequests {
    runtime: LauncherResult<JavaRuntime>,
    registry: LauncherResult<Handlers>,
}

#[async_trait]
impl LaunchRequestHandler for BrowserRequests {
    async fn launch(&self, url: &str) -> LauncherResult<()> {
        let runtime = self
            .runtime
            .as_ref()
            .map_err(|e| LauncherError::PlatformPrecheck(e.to_string()))?;
        let registry = self
            .registry
            .as_ref()
            .map_err(|e| LauncherError::Other(e.to_string()))?;
        let launcher = registry.resolve_url(url)?;
        let ctx = LaunchContext::new(Arc::new(HeadlessProgress::new()), CancelFlag::new());
        launcher.run_by_url(url, runtime, &ctx).await.map(|_| ())
    }
}

/// Failures that happen before the launcher takes over.
fn report(ctx: &LaunchContext, e: LauncherError) -> ExitCode {
    error!("{}", e);
    ctx.progress.send_error(&e.to_string());
    ExitCode::FAILURE
}

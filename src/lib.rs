pub mod cli;
mod commands;
pub mod core;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::cli::{parse_invocation, usage, Invocation};
use crate::commands::Environment;
use crate::core::descriptor::Platform;
use crate::core::state::{work_dir, LauncherSettings};

const LOG_FILE: &str = "weblaunch.log";
const DEFAULT_LOG_FILTER: &str = "info,weblaunch_lib=debug";

pub fn run() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let invocation = parse_invocation(&args);
    match &invocation {
        Invocation::Usage => {
            eprintln!("{}", usage());
            return ExitCode::from(2);
        }
        Invocation::Info(text) => {
            println!("{text}");
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let work_dir = match work_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("unable to prepare work directory: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&work_dir);

    let platform = Platform::current();
    tracing::info!(
        "WebLaunch {} starting, arguments {:?}, platform {}/{}",
        env!("CARGO_PKG_VERSION"),
        &args[1..],
        platform.os,
        platform.arch
    );

    let env = Environment {
        settings: LauncherSettings::load(&work_dir),
        work_dir,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("unable to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        match invocation {
            Invocation::Launch {
                target,
                java_dir,
                show_console,
            } => commands::launch(&env, &target, java_dir, show_console).await,
            Invocation::Uninstall { target, gui } => commands::uninstall(&env, &target, gui).await,
            Invocation::NativeMessaging {
                java_dir,
                show_console,
            } => commands::native_messaging(&env, java_dir, show_console).await,
            Invocation::Usage | Invocation::Info(_) => ExitCode::from(2),
        }
    })
}

/// Structured logs go to `<work-dir>/weblaunch.log`; stdout may be the
/// native-messaging channel. Falls back to stderr.
fn init_logging(work_dir: &Path) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(work_dir.join(LOG_FILE));

    match file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!("unable to open log file: {}", e);
        }
    }
}

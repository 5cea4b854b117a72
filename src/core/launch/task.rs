// ─── Launch Task ───
// Spawns the Java process for a prepared plan.

use std::process::{Child, Command, Stdio};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use tracing::{debug, info, warn};

use super::command::LaunchPlan;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::LaunchContext;

#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnOptions {
    /// Put the child in its own process group so closing the browser that
    /// asked for the launch does not take the application down with it.
    pub detached: bool,
}

/// Start the application. Returns as soon as the process exists.
///
/// Nothing is spawned once the launch has been cancelled.
pub fn spawn(plan: &LaunchPlan, options: SpawnOptions, ctx: &LaunchContext) -> LauncherResult<Child> {
    if ctx.is_cancelled() {
        return Err(LauncherError::Cancelled);
    }

    let mut cmd = Command::new(&plan.java);
    cmd.args(plan.args());
    // stdout may be the native-messaging channel; the child must not write to it.
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    if options.detached {
        break_away_from_parent(&mut cmd);
    }

    info!("Launching application with Java: {:?}", plan.java);
    debug!("Command (copy/paste): {}", plan.display());

    let child = cmd.spawn().map_err(|e| LauncherError::Other(format!(
        "unable to run java application: {e}"
    )))?;
    info!("Application started with pid {}", child.id());
    Ok(child)
}

/// Seam between the launch flow and the operating system.
pub trait ProcessSpawner: Send + Sync {
    /// Start the application and return its process id.
    fn spawn(&self, plan: &LaunchPlan, options: SpawnOptions, ctx: &LaunchContext) -> LauncherResult<u32>;
}

/// Starts a real Java process and lets it run on its own.
#[derive(Debug, Default)]
pub struct JavaSpawner;

impl ProcessSpawner for JavaSpawner {
    fn spawn(&self, plan: &LaunchPlan, options: SpawnOptions, ctx: &LaunchContext) -> LauncherResult<u32> {
        spawn(plan, options, ctx).map(reap)
    }
}

/// Collect the child's exit status on a background thread so it never lingers
/// as a zombie. The thread does not keep the launcher alive.
fn reap(mut child: Child) -> u32 {
    let pid = child.id();
    let reaper = std::thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!("application {} exited with {}", pid, status),
            Err(e) => warn!("unable to wait for application {}: {}", pid, e),
        });
    if let Err(e) = reaper {
        warn!("unable to watch application {}: {}", pid, e);
    }
    pid
}

#[cfg(unix)]
fn break_away_from_parent(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(target_os = "windows")]
fn break_away_from_parent(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    const CREATE_BREAKAWAY_FROM_JOB: u32 = 0x0100_0000;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP | CREATE_BREAKAWAY_FROM_JOB);
}

#[cfg(not(any(unix, target_os = "windows")))]
fn break_away_from_parent(_cmd: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::Descriptor;
    use std::path::PathBuf;

    fn plan() -> LaunchPlan {
        let d = Descriptor::parse(
            br#"<jnlp codebase="http://example.com/"><application-desc main-class="Main"/></jnlp>"#,
        )
        .unwrap();
        LaunchPlan::for_descriptor(PathBuf::from("/nonexistent/bin/java"), &d).unwrap()
    }

    #[test]
    fn cancelled_launch_spawns_nothing() {
        let ctx = LaunchContext::headless();
        ctx.cancel.cancel();
        let err = spawn(&plan(), SpawnOptions::default(), &ctx).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn missing_runtime_is_reported() {
        let ctx = LaunchContext::headless();
        let err = spawn(&plan(), SpawnOptions { detached: true }, &ctx).unwrap_err();
        assert!(err.to_string().contains("unable to run java application"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn exited_child_is_reaped() {
        let child = Command::new("true").spawn().unwrap();
        let pid = reap(child);

        let proc_entry = PathBuf::from(format!("/proc/{pid}"));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while proc_entry.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!proc_entry.exists(), "process {pid} was left as a zombie");
    }
}

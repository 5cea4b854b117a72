// ─── Java Runtime ───
// Finds the `java` and `jarsigner` executables and probes the runtime version
// before anything is downloaded.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::version::{parse_version_output, JavaVersion};
use crate::core::error::{LauncherError, LauncherResult};

/// Where the runtime location came from; reported in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaSource {
    JavaDir(PathBuf),
    JavaHome(PathBuf),
    Path,
}

impl std::fmt::Display for JavaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JavaSource::JavaDir(dir) => write!(f, "-javadir '{}' command line argument", dir.display()),
            JavaSource::JavaHome(dir) => {
                write!(f, "JAVA_HOME environment variable - {}", dir.display())
            }
            JavaSource::Path => f.write_str("PATH environment variable"),
        }
    }
}

/// Candidate executables, not yet checked.
#[derive(Debug, Clone)]
pub struct RuntimeLocation {
    pub java: PathBuf,
    pub jarsigner: PathBuf,
    pub source: JavaSource,
}

impl RuntimeLocation {
    /// Executables under `<dir>/bin`. The directory must exist.
    pub fn from_java_dir(dir: &Path, show_console: bool) -> LauncherResult<Self> {
        let absolute = std::path::absolute(dir).map_err(|e| {
            LauncherError::PlatformPrecheck(format!("invalid javadir '{}': {e}", dir.display()))
        })?;
        let metadata = std::fs::metadata(&absolute).map_err(|_| {
            LauncherError::PlatformPrecheck(format!("javadir '{}' doesn't exist", dir.display()))
        })?;
        if !metadata.is_dir() {
            return Err(LauncherError::PlatformPrecheck(format!(
                "javadir '{}' is not a directory",
                dir.display()
            )));
        }
        let bin = absolute.join("bin");
        Ok(Self {
            java: bin.join(java_exe(show_console)),
            jarsigner: bin.join(jarsigner_exe()),
            source: JavaSource::JavaDir(absolute),
        })
    }

    /// `JAVA_HOME` when set, otherwise bare names looked up on `PATH`.
    pub fn detect(show_console: bool) -> Self {
        match std::env::var_os("JAVA_HOME").filter(|home| !home.is_empty()) {
            Some(home) => {
                let home = PathBuf::from(home);
                let bin = home.join("bin");
                Self {
                    java: bin.join(java_exe(show_console)),
                    jarsigner: bin.join(jarsigner_exe()),
                    source: JavaSource::JavaHome(home),
                }
            }
            None => Self {
                java: PathBuf::from(java_exe(show_console)),
                jarsigner: PathBuf::from(jarsigner_exe()),
                source: JavaSource::Path,
            },
        }
    }

    /// `-javadir` wins over detection.
    pub fn resolve(java_dir: Option<&Path>, show_console: bool) -> LauncherResult<Self> {
        match java_dir {
            Some(dir) => Self::from_java_dir(dir, show_console),
            None => Ok(Self::detect(show_console)),
        }
    }
}

/// A runtime that passed the precheck.
#[derive(Debug, Clone)]
pub struct JavaRuntime {
    pub java: PathBuf,
    /// `None` when the tool is missing; verification is then skipped.
    pub jarsigner: Option<PathBuf>,
    pub version: JavaVersion,
}

/// Make sure `java` exists and answers `-version`. A missing `jarsigner` is
/// only logged.
pub async fn check_platform(location: &RuntimeLocation) -> LauncherResult<JavaRuntime> {
    let java = find_executable(&location.java).ok_or_else(|| {
        LauncherError::PlatformPrecheck(if location.java.is_absolute() {
            format!(
                "Java location configured using {} but Java executable {} is missing",
                location.source,
                location.java.display()
            )
        } else {
            format!(
                "java executable {} wasn't found in PATH",
                location.java.display()
            )
        })
    })?;
    info!("java executable is {:?} found using {}", java, location.source);

    let jarsigner = find_executable(&location.jarsigner);
    match &jarsigner {
        Some(path) => info!("jarsigner executable is {:?}", path),
        None => warn!(
            "jarsigner {:?} wasn't found, JAR verification will be skipped",
            location.jarsigner
        ),
    }

    let version = probe_version(&java).await?;
    info!(
        "Detected Java version {} (major={} minor={})",
        version,
        version.major(),
        version.minor()
    );

    Ok(JavaRuntime {
        java,
        jarsigner,
        version,
    })
}

/// Absolute paths must exist; bare names are searched on `PATH`.
pub fn find_executable(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    which::which(candidate).ok()
}

#[instrument]
pub async fn probe_version(java: &Path) -> LauncherResult<JavaVersion> {
    let mut cmd = Command::new(java);
    cmd.arg("-version");
    hide_window(&mut cmd);
    let output = cmd.output().await.map_err(|e| {
        LauncherError::PlatformPrecheck(format!("unable to obtain Java version: {e}"))
    })?;

    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!("java -version: {}", text.trim());
    parse_version_output(&text).ok_or_else(|| {
        LauncherError::PlatformPrecheck(format!(
            "unable to locate Java version in: {}",
            text.trim()
        ))
    })
}

fn java_exe(show_console: bool) -> &'static str {
    if cfg!(windows) {
        if show_console {
            "java.exe"
        } else {
            "javaw.exe"
        }
    } else {
        "java"
    }
}

fn jarsigner_exe() -> &'static str {
    if cfg!(windows) {
        "jarsigner.exe"
    } else {
        "jarsigner"
    }
}

#[cfg(target_os = "windows")]
fn hide_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(target_os = "windows"))]
fn hide_window(_cmd: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_dir_must_exist() {
        let err = RuntimeLocation::from_java_dir(Path::new("/definitely/not/here"), false)
            .unwrap_err();
        assert!(err.to_string().contains("doesn't exist"));
    }

    #[test]
    fn java_dir_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("java");
        std::fs::write(&file, b"").unwrap();
        let err = RuntimeLocation::from_java_dir(&file, false).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn java_dir_points_into_bin() {
        let dir = tempfile::tempdir().unwrap();
        let location = RuntimeLocation::from_java_dir(dir.path(), true).unwrap();
        assert!(location.java.starts_with(dir.path().join("bin")));
        assert!(location.jarsigner.starts_with(dir.path().join("bin")));
        assert!(matches!(location.source, JavaSource::JavaDir(_)));
    }

    #[test]
    fn missing_absolute_executable_is_not_found() {
        assert!(find_executable(Path::new("/definitely/not/here/java")).is_none());
    }

    #[tokio::test]
    async fn precheck_fails_without_java() {
        let dir = tempfile::tempdir().unwrap();
        let location = RuntimeLocation::from_java_dir(dir.path(), false).unwrap();
        let err = check_platform(&location).await.unwrap_err();
        assert!(matches!(err, LauncherError::PlatformPrecheck(_)));
        assert!(err.to_string().contains("is missing"));
    }
}

// ─── Java Invocation ───
// Turns a resolved descriptor plus the files on disk into the argument vector
// handed to the Java runtime.

use std::path::{Path, PathBuf};

use crate::core::descriptor::{Descriptor, Property};
use crate::core::error::{LauncherError, LauncherResult};

/// Everything needed to start the application.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub java: PathBuf,
    pub jvm_args: Vec<String>,
    /// Application jars first, then extension jars.
    pub classpath: Vec<PathBuf>,
    pub properties: Vec<Property>,
    pub native_dirs: Vec<PathBuf>,
    pub splash: Option<PathBuf>,
    pub main_class: String,
    pub arguments: Vec<String>,
}

impl LaunchPlan {
    /// Plan with the descriptor's main class and arguments; fails for
    /// applet-only documents and for a missing `main-class`.
    pub fn for_descriptor(java: PathBuf, descriptor: &Descriptor) -> LauncherResult<Self> {
        let application = descriptor.application()?;
        let main_class = application
            .main_class
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                LauncherError::UnsupportedDescriptor(
                    "<application-desc> has no main-class attribute".into(),
                )
            })?
            .to_string();

        Ok(Self {
            java,
            jvm_args: Vec::new(),
            classpath: Vec::new(),
            properties: Vec::new(),
            native_dirs: Vec::new(),
            splash: None,
            main_class,
            arguments: application.arguments.clone(),
        })
    }

    /// Argument vector after the program name.
    pub fn args(&self) -> Vec<String> {
        let separator = classpath_separator();
        let mut args = self.jvm_args.clone();

        let classpath = self
            .classpath
            .iter()
            .map(|p| path_str(p))
            .collect::<Vec<_>>()
            .join(separator);
        args.push("-cp".to_string());
        args.push(classpath);

        for property in &self.properties {
            args.push(format!("-D{}={}", property.name, property.value));
        }

        if !self.native_dirs.is_empty() {
            let dirs = self
                .native_dirs
                .iter()
                .map(|p| path_str(p))
                .collect::<Vec<_>>()
                .join(separator);
            args.push(format!("-Djava.library.path={dirs}"));
        }

        if let Some(splash) = &self.splash {
            args.push(format!("-splash:{}", path_str(splash)));
        }

        args.push(self.main_class.clone());
        args.extend(self.arguments.iter().cloned());
        args
    }

    /// Printable command line for the log.
    pub fn display(&self) -> String {
        std::iter::once(path_str(&self.java))
            .chain(self.args())
            .map(|arg| shell_escape(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Path as a string, without the Windows extended-length prefix that the
/// JVM's classpath handling does not understand.
pub fn path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | ';')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

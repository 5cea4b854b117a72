use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

/// weblaunch - run Java Web Start (JNLP) applications
#[derive(Parser, Debug)]
#[command(name = "weblaunch")]
#[command(version, about, long_about = None)]
#[command(override_usage = "weblaunch [options] <filename|URL>")]
pub struct Cli {
    /// Java installation to use instead of JAVA_HOME/PATH
    #[arg(long = "javadir", value_name = "DIR")]
    pub java_dir: Option<PathBuf>,

    /// Run with a console window (java instead of javaw)
    #[arg(long = "showconsole")]
    pub show_console: bool,

    /// Remove the shortcuts and files of an installed application
    #[arg(long)]
    pub uninstall: bool,

    /// Show progress while uninstalling
    #[arg(long)]
    pub gui: bool,

    /// JNLP file or URL
    #[arg(value_name = "FILENAME|URL")]
    pub targets: Vec<String>,
}

/// What one process invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Launch {
        target: String,
        java_dir: Option<PathBuf>,
        show_console: bool,
    },
    Uninstall {
        target: String,
        gui: bool,
    },
    /// Started by a browser extension; requests arrive on stdin.
    NativeMessaging {
        java_dir: Option<PathBuf>,
        show_console: bool,
    },
    /// Nothing usable given: print usage, exit 2.
    Usage,
    /// `--help`/`--version` text; printed as-is, exit 0.
    Info(String),
}

/// Browser extension origins passed as the sole argument of a messaging host.
const EXTENSION_ORIGINS: [&str; 2] = ["chrome-extension://", "moz-extension://"];

/// Rewrite the single-dash long options to clap's double-dash form.
pub fn normalize_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(index, arg)| {
            if index == 0 {
                return arg;
            }
            match arg.to_str() {
                Some("-javadir") => "--javadir".into(),
                Some("-showconsole") => "--showconsole".into(),
                Some("-uninstall") => "--uninstall".into(),
                Some("-gui") => "--gui".into(),
                Some("-help" | "-?" | "/?") => "--help".into(),
                _ => arg,
            }
        })
        .collect()
}

/// Classify a full argument vector (program name first).
pub fn parse_invocation<I, S>(args: I) -> Invocation
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args = normalize_args(args);
    if args.len() <= 1 {
        return Invocation::Usage;
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Invocation::Info(e.to_string());
        }
        // Options we don't know come from a browser starting us as a host.
        Err(_) => {
            return Invocation::NativeMessaging {
                java_dir: None,
                show_console: false,
            }
        }
    };

    match cli.targets.as_slice() {
        [] => Invocation::Usage,
        [target] if is_extension_origin(target) => Invocation::NativeMessaging {
            java_dir: cli.java_dir,
            show_console: cli.show_console,
        },
        [target] if cli.uninstall => Invocation::Uninstall {
            target: target.clone(),
            gui: cli.gui,
        },
        [target] => Invocation::Launch {
            target: target.clone(),
            java_dir: cli.java_dir,
            show_console: cli.show_console,
        },
        _ => Invocation::NativeMessaging {
            java_dir: cli.java_dir,
            show_console: cli.show_console,
        },
    }
}

pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

fn is_extension_origin(target: &str) -> bool {
    EXTENSION_ORIGINS
        .iter()
        .any(|origin| target.starts_with(origin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_dash_options_are_normalized() {
        let args = normalize_args(["weblaunch", "-javadir", "/opt/jdk", "-showconsole", "/?"]);
        assert_eq!(
            args,
            vec!["weblaunch", "--javadir", "/opt/jdk", "--showconsole", "--help"]
        );
    }

    #[test]
    fn program_name_is_never_rewritten() {
        let args = normalize_args(["-gui"]);
        assert_eq!(args, vec!["-gui"]);
    }

    #[test]
    fn no_arguments_prints_usage() {
        assert_eq!(parse_invocation(["weblaunch"]), Invocation::Usage);
        assert_eq!(
            parse_invocation(["weblaunch", "-showconsole"]),
            Invocation::Usage
        );
    }

    #[test]
    fn one_target_launches() {
        assert_eq!(
            parse_invocation(["weblaunch", "-javadir", "/opt/jdk", "-showconsole", "app.jnlp"]),
            Invocation::Launch {
                target: "app.jnlp".into(),
                java_dir: Some(PathBuf::from("/opt/jdk")),
                show_console: true,
            }
        );
    }

    #[test]
    fn uninstall_with_gui() {
        assert_eq!(
            parse_invocation(["weblaunch", "-uninstall", "-gui", "/tmp/x/original.jnlp"]),
            Invocation::Uninstall {
                target: "/tmp/x/original.jnlp".into(),
                gui: true,
            }
        );
    }

    #[test]
    fn browser_invocations_start_the_listener() {
        assert!(matches!(
            parse_invocation(["weblaunch", "chrome-extension://abcdef/"]),
            Invocation::NativeMessaging { .. }
        ));
        assert!(matches!(
            parse_invocation(["weblaunch", "chrome-extension://abcdef/", "--parent-window=0"]),
            Invocation::NativeMessaging { .. }
        ));
        assert!(matches!(
            parse_invocation(["weblaunch", "/path/manifest.json", "weblaunch@example.com"]),
            Invocation::NativeMessaging { .. }
        ));
    }

    #[test]
    fn help_is_informational() {
        assert!(matches!(
            parse_invocation(["weblaunch", "-help"]),
            Invocation::Info(_)
        ));
        assert!(usage().contains("-javadir"));
    }
}

// ─── Desktop Integration ───
// Shortcuts and "installed apps" records. The launcher only talks to the
// `DesktopIntegration` trait; what exists behind it depends on the platform.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutLocation {
    Desktop,
    /// Application menu, optionally inside a named folder.
    Menu { submenu: String },
}

/// One shortcut that re-launches an installed application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub location: ShortcutLocation,
    pub title: String,
    pub description: String,
    pub icon: Option<PathBuf>,
    pub target: PathBuf,
    pub arguments: Vec<String>,
}

/// Identifies shortcuts to remove. Removing something absent is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutId {
    Desktop { title: String },
    /// The whole `submenu` folder, or just the `title` entry when the
    /// shortcut sits at the top of the menu.
    Menu { submenu: String, title: String },
}

/// Entry for the platform's list of installed applications.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppInfo {
    pub title: String,
    pub uninstall_command: String,
    pub icon: Option<PathBuf>,
    pub version: String,
    pub url: String,
    pub publisher: String,
}

pub trait DesktopIntegration: Send + Sync {
    fn create_shortcut(&self, spec: &ShortcutSpec) -> LauncherResult<()>;
    fn remove_shortcut(&self, id: &ShortcutId) -> LauncherResult<()>;
    fn register_installed_app(&self, app: &AppInfo) -> LauncherResult<()>;
    fn deregister_installed_app(&self, title: &str) -> LauncherResult<()>;
}

/// Integration for platforms without shortcut support: every request is
/// logged and succeeds.
#[derive(Debug, Default)]
pub struct LoggingIntegration;

impl DesktopIntegration for LoggingIntegration {
    fn create_shortcut(&self, spec: &ShortcutSpec) -> LauncherResult<()> {
        info!("shortcut {:?} for '{}' not supported here", spec.location, spec.title);
        Ok(())
    }

    fn remove_shortcut(&self, id: &ShortcutId) -> LauncherResult<()> {
        debug!("nothing to remove for {:?}", id);
        Ok(())
    }

    fn register_installed_app(&self, app: &AppInfo) -> LauncherResult<()> {
        info!("installed-apps registration of '{}' not supported here", app.title);
        Ok(())
    }

    fn deregister_installed_app(&self, title: &str) -> LauncherResult<()> {
        debug!("nothing to deregister for '{}'", title);
        Ok(())
    }
}

/// `.desktop` entries on the desktop and in the user's applications menu.
#[derive(Debug, Clone)]
pub struct FreedesktopIntegration {
    desktop_dir: PathBuf,
    applications_dir: PathBuf,
}

impl FreedesktopIntegration {
    pub fn new(desktop_dir: PathBuf, applications_dir: PathBuf) -> Self {
        Self {
            desktop_dir,
            applications_dir,
        }
    }

    /// XDG locations of the current user, when they can be determined.
    pub fn for_current_user() -> Option<Self> {
        let desktop = dirs::desktop_dir()?;
        let applications = dirs::data_dir()?.join("applications");
        Some(Self::new(desktop, applications))
    }

    fn shortcut_path(&self, location: &ShortcutLocation, title: &str) -> PathBuf {
        let file = format!("{}.desktop", file_safe(title));
        match location {
            ShortcutLocation::Desktop => self.desktop_dir.join(file),
            ShortcutLocation::Menu { submenu } if submenu.trim().is_empty() => {
                self.applications_dir.join(file)
            }
            ShortcutLocation::Menu { submenu } => {
                self.applications_dir.join(file_safe(submenu)).join(file)
            }
        }
    }
}

impl DesktopIntegration for FreedesktopIntegration {
    fn create_shortcut(&self, spec: &ShortcutSpec) -> LauncherResult<()> {
        let path = self.shortcut_path(&spec.location, &spec.title);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        std::fs::write(&path, desktop_entry(spec)).map_err(|e| LauncherError::io(&path, e))?;
        set_executable(&path)?;
        info!("created shortcut {:?}", path);
        Ok(())
    }

    fn remove_shortcut(&self, id: &ShortcutId) -> LauncherResult<()> {
        let result = match id {
            ShortcutId::Desktop { title } => {
                std::fs::remove_file(self.shortcut_path(&ShortcutLocation::Desktop, title))
            }
            ShortcutId::Menu { submenu, title } if submenu.trim().is_empty() => {
                let location = ShortcutLocation::Menu {
                    submenu: String::new(),
                };
                std::fs::remove_file(self.shortcut_path(&location, title))
            }
            ShortcutId::Menu { submenu, .. } => {
                std::fs::remove_dir_all(self.applications_dir.join(file_safe(submenu)))
            }
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LauncherError::Other(format!("removing shortcut {id:?}: {e}"))),
        }
    }

    fn register_installed_app(&self, app: &AppInfo) -> LauncherResult<()> {
        debug!("freedesktop has no installed-apps list, skipping '{}'", app.title);
        Ok(())
    }

    fn deregister_installed_app(&self, _title: &str) -> LauncherResult<()> {
        Ok(())
    }
}

/// Integration for the running platform.
pub fn platform_integration() -> Box<dyn DesktopIntegration> {
    if cfg!(target_os = "linux") {
        if let Some(integration) = FreedesktopIntegration::for_current_user() {
            return Box::new(integration);
        }
    }
    Box::new(LoggingIntegration)
}

fn desktop_entry(spec: &ShortcutSpec) -> String {
    let exec = std::iter::once(spec.target.to_string_lossy().to_string())
        .chain(spec.arguments.iter().cloned())
        .map(|arg| exec_quote(&arg))
        .collect::<Vec<_>>()
        .join(" ");

    let mut entry = String::from("[Desktop Entry]\nType=Application\n");
    entry.push_str(&format!("Name={}\n", single_line(&spec.title)));
    if !spec.description.is_empty() {
        entry.push_str(&format!("Comment={}\n", single_line(&spec.description)));
    }
    entry.push_str(&format!("Exec={exec}\n"));
    if let Some(icon) = &spec.icon {
        entry.push_str(&format!("Icon={}\n", icon.display()));
    }
    entry.push_str("Terminal=false\n");
    entry
}

fn exec_quote(arg: &str) -> String {
    let reserved = |c: char| c.is_whitespace() || "\"'\\><~|&;$*?#()`".contains(c);
    if !arg.is_empty() && !arg.chars().any(reserved) {
        return arg.to_string();
    }
    let mut quoted = String::from("\"");
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn file_safe(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "application".to_string()
    } else {
        cleaned
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| LauncherError::io(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> LauncherResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integration(root: &Path) -> FreedesktopIntegration {
        FreedesktopIntegration::new(root.join("Desktop"), root.join("applications"))
    }

    fn spec(location: ShortcutLocation) -> ShortcutSpec {
        ShortcutSpec {
            location,
            title: "Dynamic Tree".into(),
            description: "Tooltip text".into(),
            icon: Some(PathBuf::from("/res/icon.ico")),
            target: PathBuf::from("/usr/bin/weblaunch"),
            arguments: vec!["-javadir".into(), "/opt/my jdk".into(), "/res/original.jnlp".into()],
        }
    }

    #[test]
    fn desktop_entry_quotes_arguments() {
        let entry = desktop_entry(&spec(ShortcutLocation::Desktop));
        assert!(entry.contains("Name=Dynamic Tree\n"));
        assert!(entry.contains("Comment=Tooltip text\n"));
        assert!(entry.contains(
            "Exec=/usr/bin/weblaunch -javadir \"/opt/my jdk\" /res/original.jnlp\n"
        ));
        assert!(entry.contains("Icon=/res/icon.ico\n"));
    }

    #[test]
    fn creates_and_removes_desktop_shortcut() {
        let root = tempfile::tempdir().unwrap();
        let integration = integration(root.path());
        integration.create_shortcut(&spec(ShortcutLocation::Desktop)).unwrap();
        let file = root.path().join("Desktop").join("Dynamic Tree.desktop");
        assert!(file.exists());

        let id = ShortcutId::Desktop {
            title: "Dynamic Tree".into(),
        };
        integration.remove_shortcut(&id).unwrap();
        assert!(!file.exists());
        // Removing again is fine.
        integration.remove_shortcut(&id).unwrap();
    }

    #[test]
    fn menu_shortcut_lives_in_submenu_folder() {
        let root = tempfile::tempdir().unwrap();
        let integration = integration(root.path());
        integration
            .create_shortcut(&spec(ShortcutLocation::Menu {
                submenu: "Example".into(),
            }))
            .unwrap();
        let folder = root.path().join("applications").join("Example");
        assert!(folder.join("Dynamic Tree.desktop").exists());

        integration
            .remove_shortcut(&ShortcutId::Menu {
                submenu: "Example".into(),
                title: "Dynamic Tree".into(),
            })
            .unwrap();
        assert!(!folder.exists());
    }

    #[test]
    fn top_level_menu_shortcut_is_removed_alone() {
        let root = tempfile::tempdir().unwrap();
        let integration = integration(root.path());
        let applications = root.path().join("applications");
        std::fs::create_dir_all(&applications).unwrap();
        std::fs::write(applications.join("Other App.desktop"), "[Desktop Entry]\n").unwrap();
        integration
            .create_shortcut(&spec(ShortcutLocation::Menu {
                submenu: String::new(),
            }))
            .unwrap();
        let entry = applications.join("Dynamic Tree.desktop");
        assert!(entry.exists());

        let id = ShortcutId::Menu {
            submenu: String::new(),
            title: "Dynamic Tree".into(),
        };
        integration.remove_shortcut(&id).unwrap();
        assert!(!entry.exists());
        assert!(applications.join("Other App.desktop").exists());
        integration.remove_shortcut(&id).unwrap();
    }

    #[test]
    fn unsafe_names_are_flattened() {
        assert_eq!(file_safe("a/b"), "a_b");
        assert_eq!(file_safe(".."), "application");
        assert_eq!(file_safe(""), "application");
    }
}

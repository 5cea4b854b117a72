use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "weblaunch";
const SETTINGS_FILE: &str = "settings.json";

pub const ENV_WORK_DIR: &str = "WEBLAUNCH_WORK_DIR";
pub const ENV_DISABLE_VERIFICATION: &str = "WEBLAUNCH_DISABLE_VERIFICATION";

/// Administrator settings, read from `<work-dir>/settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Skip `jarsigner -verify`. Signer consistency is still enforced.
    pub disable_verification: bool,
    /// Register launched applications in the installed-apps list.
    pub add_app_to_control_panel: bool,
    /// Java installation used when `-javadir` isn't given.
    pub java_dir: Option<PathBuf>,
}

impl LauncherSettings {
    /// Settings file merged with environment overrides. A missing or broken
    /// file yields defaults.
    pub fn load(work_dir: &Path) -> Self {
        let mut settings = load_settings_from_disk(work_dir).unwrap_or_default();
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_DISABLE_VERIFICATION) {
            self.disable_verification = is_truthy(&value);
        }
    }

    pub fn save(&self, work_dir: &Path) -> LauncherResult<()> {
        let path = work_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
    }
}

fn load_settings_from_disk(work_dir: &Path) -> Option<LauncherSettings> {
    let path = work_dir.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("ignoring malformed {:?}: {}", path, e);
            None
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Root of all resource directories: `$WEBLAUNCH_WORK_DIR`, else
/// `<temp>/weblaunch`. Created when missing.
pub fn work_dir() -> LauncherResult<PathBuf> {
    let dir = std::env::var_os(ENV_WORK_DIR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_work_dir);
    ensure_dir(&dir)?;
    Ok(dir)
}

pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join(APP_DIR_NAME)
}

fn ensure_dir(dir: &Path) -> LauncherResult<()> {
    if !dir.exists() {
        info!("creating work dir {:?}", dir);
    }
    std::fs::create_dir_all(dir).map_err(|e| LauncherError::io(dir, e))
}

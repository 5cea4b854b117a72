mod settings;

pub use settings::{
    default_work_dir, work_dir, LauncherSettings, ENV_DISABLE_VERIFICATION, ENV_WORK_DIR,
};

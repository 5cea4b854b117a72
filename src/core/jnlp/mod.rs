mod launcher;
mod state;
mod uninstall;


pub use launcher::{progress_max, JnlpLauncher, LaunchOptions, PRODUCT_TITLE};
pub use state::LaunchState;

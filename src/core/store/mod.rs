mod resource_dir;
mod update;

pub use resource_dir::{directory_for, remove_resource_dir, save_original, ORIGINAL_DESCRIPTOR};
pub use update::{check_for_update, UpdateCheck};

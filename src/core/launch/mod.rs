pub mod command;
pub mod natives;
pub mod task;

pub use command::{classpath_separator, path_str, LaunchPlan};
pub use natives::{extract_archive, extract_natives, natives_dir_for};
pub use task::{spawn, JavaSpawner, ProcessSpawner, SpawnOptions};

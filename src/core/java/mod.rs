pub mod runtime;
pub mod version;

pub use runtime::{check_platform, find_executable, JavaRuntime, JavaSource, RuntimeLocation};
pub use version::{check_required_versions, JavaVersion, VersionRequirement};

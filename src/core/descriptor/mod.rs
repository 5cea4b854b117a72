mod model;
mod platform;

pub use model::{
    normalize_url, resolve_codebase, resolve_href, ApplicationDesc, ArchiveRef, Description,
    Descriptor, ExtensionRef, Icon, Information, JarRef, JavaRequirement, NativeLibRef, Property,
    ResolvedExtension, ResolvedResources, ResourceSet,
};
pub use platform::{is_relevant, split_escaped, Platform};

// ─── Launch Registry ───
// Maps URL schemes and file extensions to the launcher that handles them.

use std::collections::HashMap;
use std::path::Path;

use url::Url;

use crate::core::error::{LauncherError, LauncherResult};

/// A handler found for an identifier, and whether it was resolved as a URL.
#[derive(Debug, Clone)]
pub struct Resolved<H> {
    pub handler: H,
    pub by_url: bool,
}

/// Built once at startup and shared by reference with whatever resolves
/// launch requests.
#[derive(Debug, Clone)]
pub struct Registry<H> {
    schemes: HashMap<String, H>,
    extensions: HashMap<String, H>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            schemes: HashMap::new(),
            extensions: HashMap::new(),
        }
    }
}

impl<H: Clone> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_scheme(&mut self, scheme: &str, handler: H) -> &mut Self {
        self.schemes.insert(scheme.to_ascii_lowercase(), handler);
        self
    }

    pub fn register_extension(&mut self, extension: &str, handler: H) -> &mut Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extensions.insert(extension, handler);
        self
    }

    /// Resolve an absolute URL or a filename to its handler.
    ///
    /// URLs prefer an exact scheme match; `http`/`https` fall back to the
    /// extension of the URL path. Anything that isn't an absolute URL is
    /// matched by extension only.
    pub fn resolve(&self, identifier: &str) -> LauncherResult<Resolved<H>> {
        if let Some(url) = parse_absolute_url(identifier) {
            if let Some(handler) = self.schemes.get(url.scheme()) {
                return Ok(Resolved {
                    handler: handler.clone(),
                    by_url: true,
                });
            }
            if matches!(url.scheme(), "http" | "https") {
                if let Some(handler) = self.by_extension(url.path()) {
                    return Ok(Resolved {
                        handler,
                        by_url: true,
                    });
                }
            }
            return Err(LauncherError::NoHandlerFound(identifier.to_string()));
        }

        self.by_extension(identifier)
            .map(|handler| Resolved {
                handler,
                by_url: false,
            })
            .ok_or_else(|| LauncherError::NoHandlerFound(identifier.to_string()))
    }

    /// Resolve only if `identifier` is an absolute URL (native-messaging requests).
    pub fn resolve_url(&self, identifier: &str) -> LauncherResult<H> {
        match self.resolve(identifier)? {
            Resolved {
                handler,
                by_url: true,
            } => Ok(handler),
            _ => Err(LauncherError::NoHandlerFound(format!(
                "URL {identifier} is not absolute"
            ))),
        }
    }

    fn by_extension(&self, path: &str) -> Option<H> {
        let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        self.extensions.get(&extension).cloned()
    }
}

fn parse_absolute_url(identifier: &str) -> Option<Url> {
    let url = Url::parse(identifier).ok()?;
    // `C:\apps\a.jnlp` parses with scheme "c"; that's a drive letter, not a URL.
    if url.scheme().len() == 1 {
        return None;
    }
    Some(url)
}

use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    // ── Descriptor ──────────────────────────────────────
    #[error("JNLP parse error: {0}")]
    Parse(String),

    #[error("Unsupported descriptor: {0}")]
    UnsupportedDescriptor(String),

    // ── Trust ───────────────────────────────────────────
    #[error("JAR verification failed for {path:?}: {message}")]
    Verification { path: PathBuf, message: String },

    #[error("all JARs have to be signed with the same certificate ({path:?} differs)")]
    SignerMismatch { path: PathBuf },

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Extraction of {archive:?} failed: {message}")]
    Extraction { archive: PathBuf, message: String },

    // ── Platform ────────────────────────────────────────
    #[error("Platform check failed: {0}")]
    PlatformPrecheck(String),

    #[error("Unable to find a handler for {0}")]
    NoHandlerFound(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Control flow ────────────────────────────────────
    #[error("cancelled by user")]
    Cancelled,

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<LauncherError>,
    },

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// True when the error (or any error it wraps) is a user cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            LauncherError::Cancelled => true,
            LauncherError::Context { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Innermost error, skipping context layers.
    pub fn root(&self) -> &LauncherError {
        match self {
            LauncherError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

/// Attaches a description of the stage/resource to an error on its way up.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> LauncherResult<T>;

    fn with_context<F, S>(self, f: F) -> LauncherResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for LauncherResult<T> {
    fn context(self, context: impl Into<String>) -> LauncherResult<T> {
        self.map_err(|source| wrap(context.into(), source))
    }

    fn with_context<F, S>(self, f: F) -> LauncherResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| wrap(f().into(), source))
    }
}

fn wrap(context: String, source: LauncherError) -> LauncherError {
    // Cancellation stays recognisable without unwrapping.
    if matches!(source, LauncherError::Cancelled) {
        return source;
    }
    LauncherError::Context {
        context,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chain_renders_outermost_first() {
        let err: LauncherResult<()> = Err(LauncherError::Parse("unexpected EOF".into()));
        let err = err.context("parsing JNLP").unwrap_err();
        assert_eq!(err.to_string(), "parsing JNLP: JNLP parse error: unexpected EOF");
        assert!(matches!(err.root(), LauncherError::Parse(_)));
    }

    #[test]
    fn cancellation_is_not_wrapped() {
        let err: LauncherResult<()> = Err(LauncherError::Cancelled);
        let err = err.context("downloading a.jar").unwrap_err();
        assert!(matches!(err, LauncherError::Cancelled));
        assert!(err.is_cancelled());
    }
}

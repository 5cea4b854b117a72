use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Name of the saved descriptor inside every resource directory.
pub const ORIGINAL_DESCRIPTOR: &str = "original.jnlp";

/// Digest prefix length (bytes) used for directory names.
const DIGEST_PREFIX: usize = 16;

/// Resource directory of a descriptor: `<work_dir>/<base64url(sha256[..16])>`.
///
/// Bit-identical descriptors always share a directory.
pub fn directory_for(work_dir: &Path, descriptor_bytes: &[u8]) -> PathBuf {
    let digest = Sha256::digest(descriptor_bytes);
    work_dir.join(URL_SAFE_NO_PAD.encode(&digest[..DIGEST_PREFIX]))
}

/// Persist the descriptor bytes as `original.jnlp`, creating the directory.
pub async fn save_original(dir: &Path, descriptor_bytes: &[u8]) -> LauncherResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))?;

    let path = dir.join(ORIGINAL_DESCRIPTOR);
    tokio::fs::write(&path, descriptor_bytes)
        .await
        .map_err(|e| LauncherError::io(&path, e))?;
    debug!("saved descriptor to {:?}", path);
    Ok(path)
}

/// Delete a resource directory. Missing directories are fine; anything else
/// is logged and swallowed.
pub async fn remove_resource_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => info!("Removed resource directory {:?}", dir),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("resource directory {:?} already gone", dir)
        }
        Err(e) => warn!("Unable to remove resource directory {:?}: {}", dir, e),
    }
}

// ─── Native Library Extraction ───
// Unpacks `<nativelib>` archives next to the jars, one directory per archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult, ResultExt};
use crate::core::progress::LaunchContext;

/// Directory a native archive is unpacked into: its path minus the extension.
pub fn natives_dir_for(archive: &Path) -> PathBuf {
    match archive.file_stem() {
        Some(stem) => archive.with_file_name(stem),
        None => archive.to_path_buf(),
    }
}

/// Extract every downloaded native archive. Returns the target directories in
/// archive order, ready for `java.library.path`.
pub async fn extract_natives(
    archives: &[PathBuf],
    ctx: &LaunchContext,
) -> LauncherResult<Vec<PathBuf>> {
    let mut dirs = Vec::with_capacity(archives.len());
    for archive in archives {
        if ctx.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("extracting Nativelib {}", name);
        ctx.progress
            .send_text(&format!("Extracting Nativelib {name}"));

        let target = natives_dir_for(archive);
        let (source, dest) = (archive.clone(), target.clone());
        tokio::task::spawn_blocking(move || extract_archive(&source, &dest))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
            .with_context(|| format!("extracting nativelib {name}"))?;
        dirs.push(target);
    }

    if ctx.is_cancelled() {
        return Err(LauncherError::Cancelled);
    }
    Ok(dirs)
}

/// Unpack `archive` into a freshly emptied `target`.
///
/// Every entry must stay inside `target`. All entry paths are checked before
/// the old contents are removed, so a rejected archive leaves `target` as it
/// was.
pub fn extract_archive(archive: &Path, target: &Path) -> LauncherResult<()> {
    let file = fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let entries = enclosed_paths(&mut zip, archive)?;

    match fs::remove_dir_all(target) {
        Ok(()) => debug!("removed previous contents of {:?}", target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(LauncherError::io(target, e)),
    }
    fs::create_dir_all(target).map_err(|e| LauncherError::io(target, e))?;

    for (index, relative) in entries.into_iter().enumerate() {
        let mut entry = zip.by_index(index)?;
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                .map_err(|e| LauncherError::io(&out_path, e))?;
        }
    }

    Ok(())
}

/// Relative path of every entry, in archive order.
fn enclosed_paths<R: io::Read + io::Seek>(
    zip: &mut zip::ZipArchive<R>,
    archive: &Path,
) -> LauncherResult<Vec<PathBuf>> {
    (0..zip.len())
        .map(|index| {
            let entry = zip.by_index_raw(index)?;
            entry.enclosed_name().ok_or_else(|| LauncherError::Extraction {
                archive: archive.to_path_buf(),
                message: format!("illegal file path: {}", entry.name()),
            })
        })
        .collect()
}

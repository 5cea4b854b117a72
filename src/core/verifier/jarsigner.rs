// ─── JAR Signature Verification ───
// Runs the JDK `jarsigner` tool and pulls the signer certificate out of
// META-INF so all archives of one launch can be compared.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

const VERIFIED_MARKER: &str = "jar verified.";
const VERBOSE_HINT: &str = "Re-run jarsigner with the -verbose option for more details.";

/// Opaque signer identity bytes extracted from a signed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short SHA-256 fingerprint for log lines.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..8])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The signer tool isn't available; nothing was checked.
    Skipped,
}

/// Trust seam of the acquisition pipeline.
#[async_trait]
pub trait ArchiveVerifier: Send + Sync {
    async fn verify(&self, archive: &Path) -> LauncherResult<VerifyOutcome>;

    async fn certificate(&self, archive: &Path) -> LauncherResult<Certificate>;
}

/// `jarsigner -verify` wrapper. Without a tool path verification is skipped.
#[derive(Debug, Clone)]
pub struct JarSigner {
    tool: Option<PathBuf>,
}

impl JarSigner {
    pub fn new(tool: Option<PathBuf>) -> Self {
        if tool.is_none() {
            warn!("jarsigner is not available, JAR verification will be skipped");
        }
        Self { tool }
    }

    pub fn is_available(&self) -> bool {
        self.tool.is_some()
    }

    async fn run(&self, tool: &Path, archive: &Path, verbose: bool) -> LauncherResult<String> {
        let mut cmd = Command::new(tool);
        cmd.arg("-verify");
        if verbose {
            cmd.arg("-verbose");
        }
        cmd.arg(archive);
        configure_hidden_window(&mut cmd);

        let output = cmd.output().await.map_err(|e| LauncherError::Verification {
            path: archive.to_path_buf(),
            message: format!("unable to run jarsigner: {e}"),
        })?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !output.status.success() {
            return Err(LauncherError::Verification {
                path: archive.to_path_buf(),
                message: format!("jarsigner exited with {}: {}", output.status, combined.trim()),
            });
        }
        Ok(combined)
    }
}

#[async_trait]
impl ArchiveVerifier for JarSigner {
    async fn verify(&self, archive: &Path) -> LauncherResult<VerifyOutcome> {
        let Some(tool) = self.tool.as_deref() else {
            debug!("skipping verification of {:?}: no jarsigner", archive);
            return Ok(VerifyOutcome::Skipped);
        };

        let output = self.run(tool, archive, false).await?;
        if output.contains(VERIFIED_MARKER) {
            info!("JAR {:?} verified", archive);
            return Ok(VerifyOutcome::Verified);
        }

        let mut message = output.trim().to_string();
        if message.contains(VERBOSE_HINT) {
            message = message.replace(VERBOSE_HINT, "See log file for more details.");
            // One verbose re-run, for the log only.
            match self.run(tool, archive, true).await {
                Ok(verbose) => warn!("jarsigner -verbose for {:?}:\n{}", archive, verbose),
                Err(e) => warn!("jarsigner -verbose for {:?} failed: {}", archive, e),
            }
        }

        Err(LauncherError::Verification {
            path: archive.to_path_buf(),
            message,
        })
    }

    async fn certificate(&self, archive: &Path) -> LauncherResult<Certificate> {
        let path = archive.to_path_buf();
        tokio::task::spawn_blocking(move || read_certificate(&path))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
    }
}

/// Signature block (`META-INF/*.RSA|DSA|EC`) of a JAR. When several exist the
/// last one in the archive wins.
pub fn read_certificate(archive: &Path) -> LauncherResult<Certificate> {
    let file = std::fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut certificate = None;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = entry.name().to_string();
        let Some(file_name) = name.strip_prefix("META-INF/") else {
            continue;
        };
        if file_name.contains('/') || !is_signature_block(file_name) {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| LauncherError::io(archive, e))?;
        certificate = Some(Certificate::new(data));
    }

    certificate.ok_or_else(|| LauncherError::Verification {
        path: archive.to_path_buf(),
        message: "unable to find certificate in JAR file".into(),
    })
}

fn is_signature_block(file_name: &str) -> bool {
    [".RSA", ".DSA", ".EC"]
        .iter()
        .any(|ext| file_name.len() > ext.len() && file_name.ends_with(ext))
}

#[cfg(target_os = "windows")]
fn configure_hidden_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(target_os = "windows"))]
fn configure_hidden_window(_cmd: &mut Command) {}

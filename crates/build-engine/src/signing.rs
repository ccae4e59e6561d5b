//! AAB Signing
//!
//! Sign bundles with jarsigner (SHA-256 digest, SHA256withRSA).

use std::path::{Path, PathBuf};
use std::time::Duration;

use apk2aab_core::{KeyStore, ToolCommand};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::BuildError;

pub const DIGEST_ALGORITHM: &str = "SHA-256";
pub const SIGNATURE_ALGORITHM: &str = "SHA256withRSA";

/// Where the signed archive ends up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningMode {
    /// jarsigner rewrites the input archive
    #[default]
    InPlace,
    /// Signed copy written next to the input as `<name>-signed.aab`
    SeparateCopy,
}

/// `app.aab` -> `app-signed.aab`; only a trailing `.aab` is replaced
pub fn signed_archive_path(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let signed = match name.strip_suffix(".aab") {
        Some(stem) => format!("{}-signed.aab", stem),
        None => format!("{}-signed.aab", name),
    };
    archive.with_file_name(signed)
}

/// Capability: sign an archive with a keystore entry
#[async_trait]
pub trait CodeSigner: Send + Sync {
    /// Returns the path of the signed archive
    async fn sign(&self, archive: &Path, keystore: &KeyStore, mode: SigningMode) -> Result<PathBuf, BuildError>;
}

/// `jarsigner` from the JDK
pub struct Jarsigner {
    program: PathBuf,
    timeout: Duration,
}

impl Jarsigner {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    pub fn command(&self, archive: &Path, keystore: &KeyStore, mode: SigningMode) -> ToolCommand {
        let mut cmd = ToolCommand::new("jarsigner", &self.program)
            .arg("-verbose")
            .args(["-sigalg", SIGNATURE_ALGORITHM, "-digestalg", DIGEST_ALGORITHM])
            .args(["-storetype", keystore.store_type.as_str()])
            .arg("-keystore")
            .path_arg(keystore.path())
            .arg("-storepass")
            .secret_arg(keystore.store_password())
            .arg("-keypass")
            .secret_arg(keystore.effective_key_password());

        if mode == SigningMode::SeparateCopy {
            cmd = cmd.arg("-signedjar").path_arg(&signed_archive_path(archive));
        }

        cmd.path_arg(archive).arg(&keystore.alias).timeout(self.timeout)
    }
}

#[async_trait]
impl CodeSigner for Jarsigner {
    async fn sign(&self, archive: &Path, keystore: &KeyStore, mode: SigningMode) -> Result<PathBuf, BuildError> {
        let output = self
            .command(archive, keystore, mode)
            .run()
            .await?
            .ensure_success()
            .map_err(|e| BuildError::SigningError(e.to_string()))?;
        debug!("jarsigner: {}", output.stdout.trim());

        let signed = match mode {
            SigningMode::InPlace => archive.to_path_buf(),
            SigningMode::SeparateCopy => signed_archive_path(archive),
        };
        info!("  AAB signed successfully: {:?}", signed);
        Ok(signed)
    }
}

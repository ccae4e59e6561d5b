//! Certificate Manager
//!
//! Creates, lists and validates the signing keystore through `keytool`.

use std::path::PathBuf;
use std::time::Duration;

use apk2aab_core::{KeyStore, ToolCommand};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::ToolchainError;

/// Capability: key material generation and inspection
#[async_trait]
pub trait KeyMaterialManager: Send + Sync {
    /// Generate an RSA-2048 self-signed entry for `keystore.alias`
    async fn generate(&self, keystore: &KeyStore, validity_days: u32, dname: &str) -> Result<(), ToolchainError>;

    /// List keystore contents, optionally restricted to one alias
    async fn list(&self, keystore: &KeyStore, alias: Option<&str>, verbose: bool) -> Result<String, ToolchainError>;
}

/// `keytool` from the JDK
pub struct Keytool {
    program: PathBuf,
    timeout: Duration,
}

impl Keytool {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    pub fn generate_command(&self, keystore: &KeyStore, validity_days: u32, dname: &str) -> ToolCommand {
        ToolCommand::new("keytool", &self.program)
            .args(["-genkeypair", "-v", "-keystore"])
            .path_arg(&keystore.path)
            .args(["-storetype", keystore.store_type.as_str()])
            .args(["-keyalg", "RSA", "-keysize", "2048"])
            .arg("-validity")
            .arg(validity_days.to_string())
            .args(["-alias", keystore.alias.as_str()])
            .arg("-storepass")
            .secret_arg(keystore.store_password())
            .arg("-keypass")
            .secret_arg(keystore.effective_key_password())
            .args(["-dname", dname])
            .timeout(self.timeout)
    }

    pub fn list_command(&self, keystore: &KeyStore, alias: Option<&str>, verbose: bool) -> ToolCommand {
        let mut cmd = ToolCommand::new("keytool", &self.program).arg("-list");
        if verbose {
            cmd = cmd.arg("-v");
        }
        cmd = cmd
            .arg("-keystore")
            .path_arg(&keystore.path)
            .arg("-storepass")
            .secret_arg(keystore.store_password());
        if let Some(alias) = alias {
            cmd = cmd.args(["-alias", alias]);
        }
        cmd.timeout(self.timeout)
    }
}

#[async_trait]
impl KeyMaterialManager for Keytool {
    async fn generate(&self, keystore: &KeyStore, validity_days: u32, dname: &str) -> Result<(), ToolchainError> {
        self.generate_command(keystore, validity_days, dname)
            .run()
            .await?
            .ensure_success()?;
        Ok(())
    }

    async fn list(&self, keystore: &KeyStore, alias: Option<&str>, verbose: bool) -> Result<String, ToolchainError> {
        let output = self
            .list_command(keystore, alias, verbose)
            .run()
            .await?
            .ensure_success()?;
        Ok(output.stdout)
    }
}

/// Whether [`CertificateManager::create_keystore`] had to create anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreStatus {
    Existing,
    Created,
}

/// Keystore lifecycle: created once, then only read
pub struct CertificateManager {
    tool: Box<dyn KeyMaterialManager>,
    validity_days: u32,
    dname: String,
}

impl CertificateManager {
    pub fn new(tool: Box<dyn KeyMaterialManager>, validity_days: u32, dname: impl Into<String>) -> Self {
        Self {
            tool,
            validity_days,
            dname: dname.into(),
        }
    }

    /// Create the keystore unless the file already exists
    pub async fn create_keystore(&self, keystore: &KeyStore) -> Result<KeystoreStatus, ToolchainError> {
        if keystore.exists() {
            info!("Keystore already exists at {:?}", keystore.path);
            return Ok(KeystoreStatus::Existing);
        }

        if let Some(parent) = keystore.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Creating keystore: {:?}", keystore.path);
        debug!("Validity {} days, dname {:?}", self.validity_days, self.dname);

        self.tool
            .generate(keystore, self.validity_days, &self.dname)
            .await?;

        info!("Keystore created successfully");
        info!("  Location: {:?}", keystore.path);
        info!("  Alias: {}", keystore.alias);
        Ok(KeystoreStatus::Created)
    }

    /// Verbose listing of every entry
    pub async fn list_keystore_info(&self, keystore: &KeyStore) -> Result<String, ToolchainError> {
        if !keystore.exists() {
            return Err(ToolchainError::KeystoreNotFound(keystore.path.clone()));
        }
        self.tool.list(keystore, None, true).await
    }

    /// Succeeds only if the alias exists and the password opens the store
    pub async fn validate_keystore(&self, keystore: &KeyStore) -> Result<(), ToolchainError> {
        if !keystore.exists() {
            return Err(ToolchainError::KeystoreNotFound(keystore.path.clone()));
        }

        self.tool
            .list(keystore, Some(&keystore.alias), false)
            .await
            .map_err(|e| ToolchainError::KeystoreInvalid(e.to_string()))?;

        info!("Keystore validated successfully");
        Ok(())
    }
}

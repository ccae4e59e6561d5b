//! Keystore reference shared by the certificate manager and the signer.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Keystore type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyStoreType {
    #[default]
    Jks,
    Pkcs12,
}

impl KeyStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStoreType::Jks => "JKS",
            KeyStoreType::Pkcs12 => "PKCS12",
        }
    }
}

/// Keystore information
#[derive(Debug)]
pub struct KeyStore {
    /// Path to keystore file
    pub path: PathBuf,
    /// Keystore password
    pub password: SecretString,
    /// Key alias
    pub alias: String,
    /// Key password (if different from keystore password)
    pub key_password: Option<SecretString>,
    /// Keystore type (JKS, PKCS12)
    pub store_type: KeyStoreType,
}

impl KeyStore {
    /// Create a new keystore reference
    pub fn new(path: impl Into<PathBuf>, password: SecretString, alias: &str) -> Self {
        Self {
            path: path.into(),
            password,
            alias: alias.to_string(),
            key_password: None,
            store_type: KeyStoreType::Jks,
        }
    }

    pub fn with_key_password(mut self, key_password: SecretString) -> Self {
        self.key_password = Some(key_password);
        self
    }

    pub fn with_store_type(mut self, store_type: KeyStoreType) -> Self {
        self.store_type = store_type;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store_password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Get the effective key password
    pub fn effective_key_password(&self) -> &str {
        self.key_password
            .as_ref()
            .unwrap_or(&self.password)
            .expose_secret()
    }

    /// Check if keystore exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_password_falls_back_to_store_password() {
        let ks = KeyStore::new("certs/release.keystore", SecretString::from("store-secret"), "release");
        assert_eq!(ks.effective_key_password(), "store-secret");

        let ks = ks.with_key_password(SecretString::from("key-secret"));
        assert_eq!(ks.effective_key_password(), "key-secret");
        assert_eq!(ks.store_password(), "store-secret");
    }

    #[test]
    fn test_debug_output_redacts_passwords() {
        let ks = KeyStore::new("release.keystore", SecretString::from("hunter2"), "release");
        let debug = format!("{:?}", ks);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("release"));
    }
}

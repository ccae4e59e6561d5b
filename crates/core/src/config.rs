//! Tool Configuration
//!
//! Everything the four entry points used to keep as module-level constants:
//! - directory layout (tools, certs, output, logs)
//! - bundletool version and download location
//! - keystore identity and credentials
//! - Java location and external tool timeouts

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::keystore::{KeyStore, KeyStoreType};

/// Default config file name, looked up in the base directory
pub const CONFIG_FILE_NAME: &str = "apk2aab.toml";

pub const ENV_STORE_PASSWORD: &str = "APK2AAB_STORE_PASSWORD";
pub const ENV_KEY_PASSWORD: &str = "APK2AAB_KEY_PASSWORD";
pub const ENV_KEY_ALIAS: &str = "APK2AAB_KEY_ALIAS";
pub const ENV_JAVA_HOME: &str = "JAVA_HOME";

/// Directory layout, relative to the base directory
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub tools_dir: PathBuf,
    pub certs_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from("tools"),
            certs_dir: PathBuf::from("certs"),
            output_dir: PathBuf::from("output"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// Bundletool release to fetch
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundletoolConfig {
    /// Pinned release version
    pub version: String,
    /// Explicit download URL (derived from the version when absent)
    pub url: Option<String>,
    /// File name inside the tools directory
    pub jar_name: String,
    /// Expected SHA-256 of the jar, hex encoded
    pub sha256: Option<String>,
}

impl Default for BundletoolConfig {
    fn default() -> Self {
        Self {
            version: "1.15.6".to_string(),
            url: None,
            jar_name: "bundletool.jar".to_string(),
            sha256: None,
        }
    }
}

impl BundletoolConfig {
    pub fn download_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "https://github.com/google/bundletool/releases/download/{v}/bundletool-all-{v}.jar",
                v = self.version
            ),
        }
    }
}

/// Signing identity
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// File name inside the certs directory
    pub file_name: String,
    pub alias: String,
    /// Certificate validity in days (~70 years by default)
    pub validity_days: u32,
    /// Distinguished name of the self-signed certificate
    pub dname: String,
    pub store_type: KeyStoreType,
    #[serde(deserialize_with = "deserialize_secret")]
    pub store_password: Option<SecretString>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub key_password: Option<SecretString>,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            file_name: "release.keystore".to_string(),
            alias: "release".to_string(),
            validity_days: 25_550,
            dname: "CN=Android App, O=Unknown, L=Unknown, ST=Unknown, C=US".to_string(),
            store_type: KeyStoreType::Jks,
            store_password: None,
            key_password: None,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Java runtime location
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    /// JDK home; `bin/` below it holds java, keytool and jarsigner
    pub java_home: Option<PathBuf>,
}

/// Timeouts for external tools, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub java_probe: u64,
    pub keytool: u64,
    pub signing: u64,
    pub inspect: u64,
    pub download: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            java_probe: 30,
            keytool: 30,
            signing: 120,
            inspect: 30,
            download: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn java_probe(&self) -> Duration {
        Duration::from_secs(self.java_probe)
    }

    pub fn keytool(&self) -> Duration {
        Duration::from_secs(self.keytool)
    }

    pub fn signing(&self) -> Duration {
        Duration::from_secs(self.signing)
    }

    pub fn inspect(&self) -> Duration {
        Duration::from_secs(self.inspect)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download)
    }
}

/// Main tool configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Root every layout directory is resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
    pub layout: LayoutConfig,
    pub bundletool: BundletoolConfig,
    pub keystore: KeystoreConfig,
    pub java: JavaConfig,
    pub timeouts: TimeoutConfig,
}

impl ToolConfig {
    /// Defaults rooted at `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document; `base_dir` is not part of the file
    pub fn from_toml(base_dir: impl Into<PathBuf>, contents: &str, origin: &Path) -> Result<Self> {
        let mut config: ToolConfig = toml::from_str(contents).map_err(|source| CoreError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    /// Load configuration for `base_dir`.
    ///
    /// Reads `explicit` when given (it must exist), otherwise
    /// `<base_dir>/apk2aab.toml` when present, then applies environment
    /// overrides.
    pub async fn load(base_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config_file = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(CoreError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => {
                let candidate = base_dir.join(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };

        let mut config = match config_file {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                let contents = tokio::fs::read_to_string(&path).await?;
                Self::from_toml(base_dir, &contents, &path)?
            }
            None => {
                debug!("No config file, using defaults");
                Self::with_base_dir(base_dir)
            }
        };

        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay secrets and locations from the environment
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(ENV_STORE_PASSWORD) {
            self.keystore.store_password = Some(SecretString::from(password));
        }
        if let Some(password) = lookup(ENV_KEY_PASSWORD) {
            self.keystore.key_password = Some(SecretString::from(password));
        }
        if let Some(alias) = lookup(ENV_KEY_ALIAS) {
            self.keystore.alias = alias;
        }
        if self.java.java_home.is_none() {
            self.java.java_home = lookup(ENV_JAVA_HOME)
                .filter(|home| !home.is_empty())
                .map(PathBuf::from);
        }
    }

    fn resolve(&self, dir: &Path) -> PathBuf {
        self.base_dir.join(dir)
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.resolve(&self.layout.tools_dir)
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.resolve(&self.layout.certs_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.layout.output_dir)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.resolve(&self.layout.logs_dir)
    }

    pub fn bundletool_jar(&self) -> PathBuf {
        self.tools_dir().join(&self.bundletool.jar_name)
    }

    pub fn keystore_path(&self) -> PathBuf {
        self.certs_dir().join(&self.keystore.file_name)
    }

    /// Resolve the signing identity; fails when no store password is configured
    pub fn keystore(&self) -> Result<KeyStore> {
        let password = self
            .keystore
            .store_password
            .clone()
            .ok_or(CoreError::MissingSecret {
                what: "keystore password",
                env_var: ENV_STORE_PASSWORD,
            })?;

        let mut keystore = KeyStore::new(self.keystore_path(), password, &self.keystore.alias)
            .with_store_type(self.keystore.store_type);
        if let Some(key_password) = self.keystore.key_password.clone() {
            keystore = keystore.with_key_password(key_password);
        }
        Ok(keystore)
    }

    /// Create the output and log directories
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.output_dir(), self.logs_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        info!("Working directory: {}", self.base_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::with_base_dir("/work");
        assert_eq!(config.bundletool.version, "1.15.6");
        assert_eq!(config.keystore.validity_days, 25_550);
        assert_eq!(config.timeouts.signing, 120);
        assert_eq!(config.bundletool_jar(), PathBuf::from("/work/tools/bundletool.jar"));
        assert_eq!(config.keystore_path(), PathBuf::from("/work/certs/release.keystore"));
        assert_eq!(config.output_dir(), PathBuf::from("/work/output"));
        assert_eq!(config.logs_dir(), PathBuf::from("/work/logs"));
    }

    #[test]
    fn test_download_url_follows_version() {
        let mut bundletool = BundletoolConfig::default();
        bundletool.version = "1.16.0".to_string();
        assert_eq!(
            bundletool.download_url(),
            "https://github.com/google/bundletool/releases/download/1.16.0/bundletool-all-1.16.0.jar"
        );

        bundletool.url = Some("https://mirror.example/bundletool.jar".to_string());
        assert_eq!(bundletool.download_url(), "https://mirror.example/bundletool.jar");
    }

    #[test]
    fn test_toml_overrides() {
        let contents = r#"
            [layout]
            output_dir = "dist"

            [keystore]
            alias = "upload"
            store_type = "PKCS12"
            store_password = "from-file"

            [timeouts]
            signing = 10
        "#;
        let config = ToolConfig::from_toml("/work", contents, Path::new("apk2aab.toml")).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("/work/dist"));
        assert_eq!(config.layout.tools_dir, PathBuf::from("tools"));
        assert_eq!(config.timeouts.signing(), Duration::from_secs(10));
        assert_eq!(config.timeouts.keytool, 30);

        let keystore = config.keystore().unwrap();
        assert_eq!(keystore.alias, "upload");
        assert_eq!(keystore.store_type, KeyStoreType::Pkcs12);
        assert_eq!(keystore.store_password(), "from-file");
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let err = ToolConfig::from_toml("/work", "[layout\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_STORE_PASSWORD, "env-store"),
            (ENV_KEY_PASSWORD, "env-key"),
            (ENV_KEY_ALIAS, "ci"),
            (ENV_JAVA_HOME, "/opt/jdk-17"),
        ]
        .into_iter()
        .collect();

        let mut config = ToolConfig::with_base_dir("/work");
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        let keystore = config.keystore().unwrap();
        assert_eq!(keystore.alias, "ci");
        assert_eq!(keystore.store_password(), "env-store");
        assert_eq!(keystore.effective_key_password(), "env-key");
        assert_eq!(config.java.java_home, Some(PathBuf::from("/opt/jdk-17")));
    }

    #[test]
    fn test_missing_store_password() {
        let mut config = ToolConfig::with_base_dir("/work");
        config.apply_env_from(|_| None);
        let err = config.keystore().unwrap_err();
        assert!(matches!(err, CoreError::MissingSecret { env_var: ENV_STORE_PASSWORD, .. }));
    }

    #[tokio::test]
    async fn test_load_reads_config_from_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[bundletool]\nversion = \"1.17.2\"\n",
        )
        .await
        .unwrap();

        let config = ToolConfig::load(dir.path(), None).await.unwrap();
        assert_eq!(config.bundletool.version, "1.17.2");
        assert_eq!(config.base_dir, dir.path());
    }

    #[tokio::test]
    async fn test_load_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ToolConfig::load(dir.path(), Some(&missing)).await.is_err());
    }
}

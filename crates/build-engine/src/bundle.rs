//! Bundle Construction
//!
//! Repackages an APK as the `base` module of a minimal App Bundle.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::BuildError;

/// Module directory holding the repackaged APK
pub const BASE_MODULE: &str = "base";
/// APK file name inside the base module
pub const UNIVERSAL_APK: &str = "universal.apk";
/// Root-level config file; plain text, not protobuf
pub const BUNDLE_CONFIG: &str = "BundleConfig.pb";
pub const BUNDLE_EXTENSION: &str = "aab";

/// Module delivery type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleType {
    AssetPack,
}

/// One module entry of the bundle config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub enabled: bool,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
}

/// Placeholder for the bundle configuration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub version: u32,
    pub modules: Vec<ModuleDescriptor>,
}

impl BundleConfig {
    /// The fixed record written by the converter
    pub fn placeholder() -> Self {
        Self {
            version: 1,
            modules: vec![ModuleDescriptor {
                name: BASE_MODULE.to_string(),
                enabled: true,
                module_type: ModuleType::AssetPack,
            }],
        }
    }

    /// Plain-text rendering stored as `BundleConfig.pb`
    pub fn to_text(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Output archive for `apk` inside `output_dir`: the APK's base name with
/// spaces replaced by underscores and an `.aab` extension.
pub fn output_path_for(apk: &Path, output_dir: &Path) -> PathBuf {
    let stem = apk
        .file_stem()
        .map(|s| s.to_string_lossy().replace(' ', "_"))
        .unwrap_or_else(|| "bundle".to_string());
    output_dir.join(format!("{}.{}", stem, BUNDLE_EXTENSION))
}

/// A freshly written bundle
#[derive(Debug, Clone)]
pub struct BuiltBundle {
    pub path: PathBuf,
    pub size: u64,
}

/// Builds the zip archive from a staging directory
pub struct BundleBuilder {
    config: BundleConfig,
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self::new(BundleConfig::placeholder())
    }
}

impl BundleBuilder {
    pub fn new(config: BundleConfig) -> Self {
        Self { config }
    }

    /// Stage `apk` as `base/universal.apk` next to the config file, then zip
    /// both into `output`. The staging directory is removed on every path out.
    pub async fn build(&self, apk: &Path, output: &Path) -> Result<BuiltBundle, BuildError> {
        if !apk.is_file() {
            return Err(BuildError::NotFound(apk.to_path_buf()));
        }

        let config_text = self.config.to_text()?;
        let apk = apk.to_path_buf();
        let output = output.to_path_buf();

        // zip is synchronous
        tokio::task::spawn_blocking(move || write_bundle(&apk, &output, &config_text))
            .await
            .map_err(|e| BuildError::BuildFailed(e.to_string()))?
    }
}

fn write_bundle(apk: &Path, output: &Path, config_text: &str) -> Result<BuiltBundle, BuildError> {
    let staging = tempfile::Builder::new().prefix("apk2aab-").tempdir()?;
    let module_dir = staging.path().join(BASE_MODULE);
    std::fs::create_dir(&module_dir)?;

    info!("  [1/2] Preparing APK module...");
    let staged_apk = module_dir.join(UNIVERSAL_APK);
    std::fs::copy(apk, &staged_apk)?;
    let staged_config = module_dir.join(BUNDLE_CONFIG);
    std::fs::write(&staged_config, config_text)?;
    debug!("Staged module in {:?}", module_dir);

    info!("  [2/2] Building AAB...");
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(File::create(output)?);

    zip.start_file(format!("{}/{}", BASE_MODULE, UNIVERSAL_APK), options)?;
    std::io::copy(&mut File::open(&staged_apk)?, &mut zip)?;

    zip.start_file(BUNDLE_CONFIG, options)?;
    zip.write_all(config_text.as_bytes())?;

    zip.finish()?;

    let size = std::fs::metadata(output)?.len();
    Ok(BuiltBundle {
        path: output.to_path_buf(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_output_name_replaces_spaces() {
        let out = output_path_for(Path::new("/downloads/demo app.apk"), Path::new("/work/output"));
        assert_eq!(out, PathBuf::from("/work/output/demo_app.aab"));

        let out = output_path_for(Path::new("my  shop v2.apk"), Path::new("out"));
        assert_eq!(out.file_name().unwrap(), "my__shop_v2.aab");

        let out = output_path_for(Path::new("release.build.apk"), Path::new("out"));
        assert_eq!(out.file_name().unwrap(), "release.build.aab");
    }

    #[test]
    fn test_placeholder_config_text() {
        let text = BundleConfig::placeholder().to_text().unwrap();
        assert!(text.contains("\"ASSET_PACK\""));

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["version"], 1);
        assert_eq!(parsed["modules"][0]["name"], "base");
        assert_eq!(parsed["modules"][0]["enabled"], true);
        assert_eq!(parsed["modules"][0]["type"], "ASSET_PACK");
    }

    #[tokio::test]
    async fn test_build_demo_app() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("demo app.apk");
        std::fs::write(&apk, b"PK\x03\x04 not really an apk").unwrap();

        let output = output_path_for(&apk, &dir.path().join("output"));
        let built = BundleBuilder::default().build(&apk, &output).await.unwrap();
        assert_eq!(built.path.file_name().unwrap(), "demo_app.aab");
        assert_eq!(built.size, std::fs::metadata(&output).unwrap().len());

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["BundleConfig.pb", "base/universal.apk"]);

        let mut entry = archive.by_name("base/universal.apk").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut payload = Vec::new();
        entry.read_to_end(&mut payload).unwrap();
        assert_eq!(payload, b"PK\x03\x04 not really an apk");
        drop(entry);

        let mut config = String::new();
        archive.by_name(BUNDLE_CONFIG).unwrap().read_to_string(&mut config).unwrap();
        let parsed: BundleConfig = serde_json::from_str(&config).unwrap();
        assert_eq!(parsed, BundleConfig::placeholder());
    }

    #[tokio::test]
    async fn test_missing_apk() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("missing.apk");
        let output = dir.path().join("missing.aab");

        let err = BundleBuilder::default().build(&apk, &output).await.unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
        assert!(!output.exists());
    }
}

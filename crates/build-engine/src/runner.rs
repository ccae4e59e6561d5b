//! Conversion Runner
//!
//! Coordinates APK -> AAB conversion: requirement check, bundle
//! construction, optional signing and the manifest dump. A failure in the
//! first two stages aborts; signing and the dump only warn.

use std::path::{Path, PathBuf};

use apk2aab_android_toolchain::JavaRuntime;
use apk2aab_core::KeyStore;
use tracing::{info, warn};

use crate::analyzer::BundleAnalyzer;
use crate::bundle::{output_path_for, BundleBuilder};
use crate::inspect::BundleInspector;
use crate::signing::{CodeSigner, SigningMode};
use crate::BuildError;

/// Signing request for one run
#[derive(Debug)]
pub struct SigningRequest {
    pub keystore: KeyStore,
    pub mode: SigningMode,
}

/// Result of the signing stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignStatus {
    Skipped,
    Signed(PathBuf),
    /// The archive exists but is unsigned
    Failed(String),
}

/// Conversion output
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Path to the produced AAB
    pub archive: PathBuf,
    /// AAB size in bytes right after construction
    pub size: u64,
    pub sign: SignStatus,
    /// bundletool's manifest dump, when it succeeded
    pub manifest: Option<String>,
}

/// Runs the conversion against injected tool capabilities
pub struct ConversionRunner {
    java: Box<dyn JavaRuntime>,
    signer: Box<dyn CodeSigner>,
    inspector: Box<dyn BundleInspector>,
    builder: BundleBuilder,
    bundletool_jar: PathBuf,
    keystore_path: PathBuf,
    output_dir: PathBuf,
}

impl ConversionRunner {
    /// Create a new conversion runner
    pub fn new(
        java: Box<dyn JavaRuntime>,
        signer: Box<dyn CodeSigner>,
        inspector: Box<dyn BundleInspector>,
        bundletool_jar: PathBuf,
        keystore_path: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            java,
            signer,
            inspector,
            builder: BundleBuilder::default(),
            bundletool_jar,
            keystore_path,
            output_dir,
        }
    }

    /// Where `apk` will be written
    pub fn output_path(&self, apk: &Path) -> PathBuf {
        output_path_for(apk, &self.output_dir)
    }

    /// Stage 1: Java, then bundletool jar, then keystore. First failure wins.
    pub async fn check_requirements(&self) -> Result<(), BuildError> {
        info!("Checking requirements...");

        let java = self
            .java
            .probe()
            .await
            .map_err(|e| BuildError::Prerequisite(e.to_string()))?;
        info!("  Java is installed ({})", java.version);

        if !self.bundletool_jar.exists() {
            return Err(BuildError::Prerequisite(format!(
                "Bundletool not found at {:?}",
                self.bundletool_jar
            )));
        }
        info!("  Bundletool found");

        if !self.keystore_path.exists() {
            return Err(BuildError::Prerequisite(format!(
                "Keystore not found at {:?}",
                self.keystore_path
            )));
        }
        info!("  Keystore found");

        Ok(())
    }

    /// Run all four stages for `apk`
    pub async fn run(&self, apk: &Path, signing: Option<&SigningRequest>) -> Result<ConversionOutput, BuildError> {
        let rule = "=".repeat(60);
        info!("{}", rule);
        info!("APK to AAB Conversion");
        info!("{}", rule);

        self.check_requirements().await?;

        let archive = self.output_path(apk);
        info!("Converting APK to AAB...");
        info!("  Input: {:?}", apk);
        info!("  Output: {:?}", archive);

        let built = self.builder.build(apk, &archive).await?;
        if !built.path.exists() {
            return Err(BuildError::BuildFailed("AAB file was not created".into()));
        }
        info!("  AAB created successfully ({})", BundleAnalyzer::format_size(built.size));

        let sign = match signing {
            Some(request) => self.sign(&archive, request).await,
            None => {
                info!("Signing disabled");
                SignStatus::Skipped
            }
        };

        let manifest = self.dump_info(&archive).await;

        info!("{}", rule);
        info!("Conversion completed!");
        info!("  Output: {:?}", archive);
        info!("{}", rule);

        Ok(ConversionOutput {
            archive,
            size: built.size,
            sign,
            manifest,
        })
    }

    /// Stage 3; failures leave the unsigned archive in place
    async fn sign(&self, archive: &Path, request: &SigningRequest) -> SignStatus {
        info!("Signing AAB...");
        info!("  Input: {:?}", archive);

        match self.signer.sign(archive, &request.keystore, request.mode).await {
            Ok(signed) => {
                info!("  Output: {:?}", signed);
                SignStatus::Signed(signed)
            }
            Err(e) => {
                warn!("Signing failed: {}", e);
                warn!("AAB created but signing failed");
                SignStatus::Failed(e.to_string())
            }
        }
    }

    /// Stage 4; failures are reported only
    async fn dump_info(&self, archive: &Path) -> Option<String> {
        info!("AAB Information:");
        match self.inspector.dump_manifest(archive).await {
            Ok(manifest) => {
                info!("  {}", manifest.trim_end());
                Some(manifest)
            }
            Err(e) => {
                warn!("Could not read manifest: {}", e);
                None
            }
        }
    }
}

//! CLI commands for apk2aab
//!
//! One command per entry point. Each takes the resolved [`ToolConfig`] and
//! wires the real tool implementations into the library pipelines.

use std::path::PathBuf;

use anyhow::{Context, Result};
use apk2aab_android_toolchain::{
    console_progress, BundletoolFetcher, CertificateManager, FetchOutcome, HttpSource, JavaProbe, JavaRuntime,
    JdkTools, Keytool, ToolchainError,
};
use apk2aab_build_engine::{
    BundleAnalyzer, Bundletool, ConversionRunner, Jarsigner, SignStatus, SigningMode, SigningRequest,
};
use apk2aab_core::ToolConfig;
use tracing::{info, warn};

fn jdk_tools(config: &ToolConfig) -> JdkTools {
    JdkTools::new(config.java.java_home.clone())
}

/// Download bundletool into the tools directory
pub struct SetupCommand;

impl SetupCommand {
    pub const LOG_FILE: &'static str = "setup.log";

    pub async fn execute(&self, config: &ToolConfig) -> Result<PathBuf> {
        info!("Setting up apk2aab in {:?}", config.base_dir);
        config.ensure_dirs().await?;

        let tools = jdk_tools(config);
        let java = JavaProbe::new(&tools, config.timeouts.java_probe())
            .probe()
            .await
            .context("Java check failed")?;
        match java.major {
            Some(major) => info!("Java found: {} ({}, Java {})", java.version, java.vendor, major),
            None => info!("Java found: {} ({})", java.version, java.vendor),
        }

        let url = config.bundletool.download_url();
        info!("Downloading bundletool v{}...", config.bundletool.version);
        info!("  URL: {}", url);

        let source = HttpSource::new(config.timeouts.download()).map_err(ToolchainError::from)?;
        let fetcher = BundletoolFetcher::new(Box::new(source), config.bundletool_jar(), url)
            .with_sha256(config.bundletool.sha256.clone());

        let outcome = fetcher
            .ensure(Some(console_progress()))
            .await
            .map_err(ToolchainError::from)
            .context("Failed to download bundletool")?;
        if let FetchOutcome::Downloaded { bytes, .. } = &outcome {
            info!("Bundletool downloaded ({})", BundleAnalyzer::format_size(*bytes));
        }

        info!("Setup complete");
        Ok(outcome.path().to_path_buf())
    }
}

/// Create the signing keystore if needed, then show or validate it
pub struct KeystoreCommand {
    pub validate: bool,
}

impl KeystoreCommand {
    pub const LOG_FILE: &'static str = "cert.log";

    pub async fn execute(&self, config: &ToolConfig) -> Result<()> {
        let keystore = config.keystore()?;
        let tools = jdk_tools(config);
        let keytool = Keytool::new(tools.keytool_path(), config.timeouts.keytool());
        let manager = CertificateManager::new(
            Box::new(keytool),
            config.keystore.validity_days,
            config.keystore.dname.clone(),
        );

        if self.validate {
            manager.validate_keystore(&keystore).await?;
            return Ok(());
        }

        manager
            .create_keystore(&keystore)
            .await
            .context("Failed to create keystore")?;

        // A failed listing does not undo a successful create
        match manager.list_keystore_info(&keystore).await {
            Ok(listing) => println!("{}", listing.trim_end()),
            Err(e) => warn!("Failed to list keystore: {}", e),
        }
        Ok(())
    }
}

/// Convert an APK into an AAB
pub struct ConvertCommand {
    pub apk: PathBuf,
    pub sign: bool,
    pub signing_mode: SigningMode,
}

impl ConvertCommand {
    pub const LOG_FILE: &'static str = "conversion.log";

    pub async fn execute(&self, config: &ToolConfig) -> Result<PathBuf> {
        config.ensure_dirs().await?;

        let signing = if self.sign {
            Some(SigningRequest {
                keystore: config.keystore()?,
                mode: self.signing_mode,
            })
        } else {
            None
        };

        let tools = jdk_tools(config);
        let runner = ConversionRunner::new(
            Box::new(JavaProbe::new(&tools, config.timeouts.java_probe())),
            Box::new(Jarsigner::new(tools.jarsigner_path(), config.timeouts.signing())),
            Box::new(Bundletool::new(
                tools.java_path(),
                config.bundletool_jar(),
                config.timeouts.inspect(),
            )),
            config.bundletool_jar(),
            config.keystore_path(),
            config.output_dir(),
        );

        let output = runner.run(&self.apk, signing.as_ref()).await?;
        match &output.sign {
            SignStatus::Signed(path) => info!("Signed bundle: {:?}", path),
            SignStatus::Failed(_) | SignStatus::Skipped => {}
        }
        Ok(output.archive)
    }
}

/// Print the module tree of an AAB
pub struct AnalyzeCommand {
    pub aab: PathBuf,
}

impl AnalyzeCommand {
    pub const LOG_FILE: &'static str = "analyze.log";

    pub async fn execute(&self, _config: &ToolConfig) -> Result<()> {
        info!("Analyzing {:?}", self.aab);
        let aab = self.aab.clone();
        let report = tokio::task::spawn_blocking(move || BundleAnalyzer::analyze(&aab)).await??;
        print!("{}", report);
        Ok(())
    }
}

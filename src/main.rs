//! apk2aab - APK to Android App Bundle converter
//!
//! Entry point: parses the command line, loads configuration, installs
//! logging for the chosen command and dispatches to it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use apk2aab::commands::{AnalyzeCommand, ConvertCommand, KeystoreCommand, SetupCommand};
use apk2aab::build::{BuildError, SigningMode};
use apk2aab::core::{logging, CoreError, FailureKind, ToolConfig, VERSION};
use apk2aab::toolchain::ToolchainError;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "apk2aab", version)]
#[command(about = "Convert APKs into Android App Bundles, sign and inspect them", long_about = None)]
struct Cli {
    /// Directory holding tools/, certs/, output/ and logs/
    #[arg(long, global = true, env = "APK2AAB_HOME", default_value = ".")]
    base_dir: PathBuf,

    /// Configuration file (defaults to <base-dir>/apk2aab.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download bundletool into the tools directory
    Setup,

    /// Create the signing keystore if missing and list its contents
    Keystore {
        /// Only check that the configured alias opens with the configured password
        #[arg(long)]
        validate: bool,
    },

    /// Convert an APK into an AAB
    Convert {
        /// APK file to convert
        apk: PathBuf,

        /// Skip signing the produced bundle
        #[arg(long)]
        no_sign: bool,

        /// Write the signed bundle to <name>-signed.aab instead of signing in place
        #[arg(long, conflicts_with = "no_sign")]
        signed_copy: bool,
    },

    /// Show the module layout of an AAB
    Analyze {
        /// AAB (or any zip) file to inspect
        aab: PathBuf,
    },
}

impl Commands {
    fn log_file(&self) -> &'static str {
        match self {
            Commands::Setup => SetupCommand::LOG_FILE,
            Commands::Keystore { .. } => KeystoreCommand::LOG_FILE,
            Commands::Convert { .. } => ConvertCommand::LOG_FILE,
            Commands::Analyze { .. } => AnalyzeCommand::LOG_FILE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let loaded = ToolConfig::load(&cli.base_dir, cli.config.as_deref()).await;

    // An unreadable config is still logged under the default layout
    let logs_dir = match &loaded {
        Ok(config) => config.logs_dir(),
        Err(_) => ToolConfig::with_base_dir(&cli.base_dir).logs_dir(),
    };
    if let Err(e) = logging::init(&logs_dir, cli.command.log_file(), cli.verbose) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    debug!("apk2aab v{}", VERSION);

    let result = match loaded {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match failure_kind(&e) {
                Some(kind) => error!("{}: {:#}", kind, e),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Classify the first typed error in the chain
fn failure_kind(err: &anyhow::Error) -> Option<FailureKind> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<ToolchainError>() {
            Some(e.kind())
        } else {
            cause.downcast_ref::<CoreError>().map(CoreError::kind)
        }
    })
}

async fn run(command: Commands, config: &ToolConfig) -> Result<()> {
    match command {
        Commands::Setup => {
            SetupCommand.execute(config).await?;
        }
        Commands::Keystore { validate } => {
            KeystoreCommand { validate }.execute(config).await?;
        }
        Commands::Convert {
            apk,
            no_sign,
            signed_copy,
        } => {
            let signing_mode = if signed_copy {
                SigningMode::SeparateCopy
            } else {
                SigningMode::InPlace
            };
            ConvertCommand {
                apk,
                sign: !no_sign,
                signing_mode,
            }
            .execute(config)
            .await?;
        }
        Commands::Analyze { aab } => {
            AnalyzeCommand { aab }.execute(config).await?;
        }
    }
    Ok(())
}

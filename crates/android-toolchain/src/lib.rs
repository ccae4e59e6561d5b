//! Android Toolchain Management
//!
//! Handles the external Java tooling apk2aab depends on:
//! - Java runtime detection and JDK tool resolution
//! - Bundletool download
//! - Keystore creation and inspection via keytool

pub mod downloader;
pub mod jdk;
pub mod keystore;

use std::path::PathBuf;

use apk2aab_core::{CoreError, FailureKind};

pub use downloader::{
    console_progress, ArtifactSource, BundletoolFetcher, DownloadError, FetchOutcome, HttpSource,
    ProgressCallback,
};
pub use jdk::{JavaInfo, JavaProbe, JavaRuntime, JdkTools};
pub use keystore::{CertificateManager, KeyMaterialManager, KeystoreStatus, Keytool};

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("Java is not available: {0}. Install Java 11+ to proceed.")]
    JavaUnavailable(String),
    #[error("Keystore not found: {0:?}")]
    KeystoreNotFound(PathBuf),
    #[error("Keystore validation failed: {0}")]
    KeystoreInvalid(String),
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Tool(#[from] CoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolchainError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ToolchainError::JavaUnavailable(_) | ToolchainError::KeystoreNotFound(_) => {
                FailureKind::MissingPrerequisite
            }
            ToolchainError::KeystoreInvalid(_) => FailureKind::ExternalTool,
            ToolchainError::Download(DownloadError::Io(_)) => FailureKind::Io,
            ToolchainError::Download(_) => FailureKind::Network,
            ToolchainError::Tool(e) => e.kind(),
            ToolchainError::Io(_) => FailureKind::Io,
        }
    }
}

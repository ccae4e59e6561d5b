//! App Bundle Build Engine
//!
//! Turns an APK into a minimal AAB, signs it and inspects the result.

pub mod analyzer;
pub mod bundle;
pub mod inspect;
pub mod runner;
pub mod signing;

pub use analyzer::{BundleAnalyzer, BundleReport, ModuleSummary};
pub use bundle::{output_path_for, BundleBuilder, BundleConfig, BuiltBundle};
pub use inspect::{BundleInspector, Bundletool};
pub use runner::{ConversionOutput, ConversionRunner, SignStatus, SigningRequest};
pub use signing::{signed_archive_path, CodeSigner, Jarsigner, SigningMode};

use std::path::PathBuf;

use apk2aab_core::{CoreError, FailureKind};

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Requirement not met: {0}")]
    Prerequisite(String),
    #[error("File not found: {0:?}")]
    NotFound(PathBuf),
    #[error("{0:?} is not a valid archive: {1}")]
    InvalidArchive(PathBuf, String),
    #[error("Build failed: {0}")]
    BuildFailed(String),
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Inspection failed: {0}")]
    InspectError(String),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Tool(#[from] CoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BuildError::Prerequisite(_) => FailureKind::MissingPrerequisite,
            BuildError::NotFound(_) => FailureKind::MissingPrerequisite,
            BuildError::InvalidArchive(..) => FailureKind::MalformedInput,
            BuildError::SigningError(_) | BuildError::InspectError(_) => FailureKind::ExternalTool,
            BuildError::Tool(e) => e.kind(),
            BuildError::BuildFailed(_) | BuildError::Zip(_) | BuildError::Json(_) | BuildError::Io(_) => {
                FailureKind::Io
            }
        }
    }
}

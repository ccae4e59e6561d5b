//! apk2aab Core - configuration and shared plumbing
//!
//! This crate provides what every apk2aab tool needs: the explicit
//! configuration structure, the error taxonomy, console/file logging and
//! timed execution of external Java tools.

pub mod config;
pub mod error;
pub mod keystore;
pub mod logging;
pub mod process;

pub use config::ToolConfig;
pub use error::{CoreError, FailureKind, Result};
pub use keystore::{KeyStore, KeyStoreType};
pub use process::{ToolCommand, ToolOutput};

/// apk2aab version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

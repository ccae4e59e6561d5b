//! JDK Tools
//!
//! Resolves java, keytool and jarsigner and probes the Java runtime.

use std::path::PathBuf;
use std::time::Duration;

use apk2aab_core::ToolCommand;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::ToolchainError;

/// Result of probing a Java runtime
#[derive(Debug, Clone)]
pub struct JavaInfo {
    pub path: PathBuf,
    pub version: String,
    pub vendor: String,
    /// Feature release, e.g. 8 for "1.8.0_392"
    pub major: Option<u32>,
}

/// Capability: is a Java runtime invocable?
#[async_trait]
pub trait JavaRuntime: Send + Sync {
    async fn probe(&self) -> Result<JavaInfo, ToolchainError>;
}

/// Locations of the JDK executables
#[derive(Debug, Clone, Default)]
pub struct JdkTools {
    java_home: Option<PathBuf>,
}

impl JdkTools {
    /// `java_home` of `None` resolves tools through `PATH`
    pub fn new(java_home: Option<PathBuf>) -> Self {
        Self { java_home }
    }

    fn locate(&self, name: &str) -> PathBuf {
        let exe = if cfg!(windows) {
            format!("{}.exe", name)
        } else {
            name.to_string()
        };

        match &self.java_home {
            Some(home) => home.join("bin").join(exe),
            None => which::which(&exe).unwrap_or_else(|_| PathBuf::from(exe)),
        }
    }

    /// Get the java executable path
    pub fn java_path(&self) -> PathBuf {
        self.locate("java")
    }

    /// Get the keytool executable path
    pub fn keytool_path(&self) -> PathBuf {
        self.locate("keytool")
    }

    /// Get the jarsigner executable path
    pub fn jarsigner_path(&self) -> PathBuf {
        self.locate("jarsigner")
    }
}

/// Runs `java -version`
pub struct JavaProbe {
    java: PathBuf,
    timeout: Duration,
}

impl JavaProbe {
    pub fn new(tools: &JdkTools, timeout: Duration) -> Self {
        Self {
            java: tools.java_path(),
            timeout,
        }
    }
}

#[async_trait]
impl JavaRuntime for JavaProbe {
    async fn probe(&self) -> Result<JavaInfo, ToolchainError> {
        debug!("Probing Java runtime at {:?}", self.java);

        let output = ToolCommand::new("java", &self.java)
            .arg("-version")
            .timeout(self.timeout)
            .run()
            .await
            .map_err(|e| ToolchainError::JavaUnavailable(e.to_string()))?
            .ensure_success()
            .map_err(|e| ToolchainError::JavaUnavailable(e.to_string()))?;

        // `java -version` reports on stderr
        let (version, vendor) = parse_version_output(&output.stderr);
        info!("Java {} ({}) at {:?}", version, vendor, self.java);

        Ok(JavaInfo {
            path: self.java.clone(),
            major: parse_major_version(&version),
            version,
            vendor,
        })
    }
}

/// Extract `(version, vendor)` from `java -version` output
pub fn parse_version_output(output: &str) -> (String, String) {
    let mut version = "unknown".to_string();
    let mut vendor = "unknown".to_string();

    for line in output.lines() {
        let line_lower = line.to_lowercase();
        if version == "unknown" && line_lower.contains("version") {
            if let Some(start) = line.find('"') {
                if let Some(end) = line[start + 1..].find('"') {
                    version = line[start + 1..start + 1 + end].to_string();
                }
            }
        }
        if line_lower.contains("temurin") || line_lower.contains("adoptium") {
            vendor = "Eclipse Temurin".to_string();
        } else if line_lower.contains("openjdk") && vendor == "unknown" {
            vendor = "OpenJDK".to_string();
        } else if line_lower.contains("oracle") || line_lower.contains("java(tm)") {
            vendor = "Oracle".to_string();
        }
    }

    (version, vendor)
}

/// Handle formats like "17.0.2", "21", "1.8.0_392"
pub fn parse_major_version(version: &str) -> Option<u32> {
    if let Some(rest) = version.strip_prefix("1.") {
        rest.split('.').next()?.parse().ok()
    } else {
        version.split(['.', '-', '+']).next()?.parse().ok()
    }
}

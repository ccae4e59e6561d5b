//! Bundle inspection through bundletool

use std::path::{Path, PathBuf};
use std::time::Duration;

use apk2aab_core::ToolCommand;
use async_trait::async_trait;

use crate::BuildError;

/// Capability: dump the manifest of a bundle
#[async_trait]
pub trait BundleInspector: Send + Sync {
    async fn dump_manifest(&self, bundle: &Path) -> Result<String, BuildError>;
}

/// `java -jar bundletool.jar dump manifest --bundle <aab>`
pub struct Bundletool {
    java: PathBuf,
    jar: PathBuf,
    timeout: Duration,
}

impl Bundletool {
    pub fn new(java: PathBuf, jar: PathBuf, timeout: Duration) -> Self {
        Self { java, jar, timeout }
    }

    pub fn dump_manifest_command(&self, bundle: &Path) -> ToolCommand {
        ToolCommand::new("bundletool", &self.java)
            .arg("-jar")
            .path_arg(&self.jar)
            .args(["dump", "manifest", "--bundle"])
            .path_arg(bundle)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl BundleInspector for Bundletool {
    async fn dump_manifest(&self, bundle: &Path) -> Result<String, BuildError> {
        if !bundle.exists() {
            return Err(BuildError::NotFound(bundle.to_path_buf()));
        }

        let output = self
            .dump_manifest_command(bundle)
            .run()
            .await?
            .ensure_success()
            .map_err(|e| BuildError::InspectError(e.to_string()))?;
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_manifest_command() {
        let bundletool = Bundletool::new(
            PathBuf::from("java"),
            PathBuf::from("/work/tools/bundletool.jar"),
            Duration::from_secs(30),
        );
        let cmd = bundletool.dump_manifest_command(Path::new("/work/output/app.aab"));
        assert_eq!(cmd.program(), Path::new("java"));
        assert_eq!(
            cmd.arg_values(),
            vec!["-jar", "/work/tools/bundletool.jar", "dump", "manifest", "--bundle", "/work/output/app.aab"]
        );
        assert_eq!(cmd.timeout_duration(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_missing_bundle() {
        let bundletool = Bundletool::new(PathBuf::from("java"), PathBuf::from("bundletool.jar"), Duration::from_secs(30));
        let err = bundletool.dump_manifest(Path::new("/nonexistent/app.aab")).await.unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
    }
}

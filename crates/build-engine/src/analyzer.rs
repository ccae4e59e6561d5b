//! AAB Analysis
//!
//! Summarize a bundle (or any zip) by top-level module directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use zip::ZipArchive;

use crate::BuildError;

/// Example entries shown per module
pub const MAX_EXAMPLES: usize = 5;

/// Entries sharing a first path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    /// First path segment
    pub name: String,
    /// Whether the group is a directory rather than a root-level file
    pub is_dir: bool,
    /// Every entry of the group, sorted
    pub entries: Vec<String>,
}

impl ModuleSummary {
    pub fn examples(&self) -> &[String] {
        &self.entries[..self.entries.len().min(MAX_EXAMPLES)]
    }

    /// Entries not shown as examples
    pub fn remaining(&self) -> usize {
        self.entries.len().saturating_sub(MAX_EXAMPLES)
    }
}

/// What the analyzer reports about one archive
#[derive(Debug, Clone)]
pub struct BundleReport {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    /// Unix permission bits; `None` where the platform has none
    pub permissions: Option<u32>,
    /// Number of central directory entries
    pub entry_count: usize,
    /// Sorted by module name
    pub modules: Vec<ModuleSummary>,
}

impl BundleReport {
    pub fn module(&self, name: &str) -> Option<&ModuleSummary> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Bundle analyzer
pub struct BundleAnalyzer;

impl BundleAnalyzer {
    /// Stat the file, then read its central directory
    pub fn analyze(path: &Path) -> Result<BundleReport, BuildError> {
        if !path.is_file() {
            return Err(BuildError::NotFound(path.to_path_buf()));
        }

        let file = std::fs::File::open(path)?;
        let metadata = file.metadata()?;

        let archive = ZipArchive::new(file)
            .map_err(|e| BuildError::InvalidArchive(path.to_path_buf(), e.to_string()))?;

        let names: Vec<&str> = archive.file_names().collect();
        let entry_count = archive.len();

        Ok(BundleReport {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
            permissions: permission_bits(&metadata),
            entry_count,
            modules: group_by_module(names),
        })
    }

    /// Get size in human-readable format
    pub fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", bytes)
        }
    }
}

/// Group entry names by their first path segment
pub fn group_by_module<'a, I>(names: I) -> Vec<ModuleSummary>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: BTreeMap<String, ModuleSummary> = BTreeMap::new();

    for name in names {
        let (module, is_dir) = match name.split_once('/') {
            Some((first, _)) => (first, true),
            None => (name, false),
        };
        let summary = groups.entry(module.to_string()).or_insert_with(|| ModuleSummary {
            name: module.to_string(),
            is_dir,
            entries: Vec::new(),
        });
        summary.is_dir |= is_dir;
        summary.entries.push(name.to_string());
    }

    groups
        .into_values()
        .map(|mut summary| {
            summary.entries.sort();
            summary
        })
        .collect()
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}

impl fmt::Display for BundleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        writeln!(f, "{}", rule)?;
        writeln!(f, "AAB File Information: {}", name)?;
        writeln!(f, "{}", rule)?;

        writeln!(f)?;
        writeln!(f, "File Details:")?;
        writeln!(
            f,
            "  Size: {:.2} MB ({:.0} KB)",
            self.size as f64 / (1024.0 * 1024.0),
            self.size as f64 / 1024.0
        )?;
        match &self.modified {
            Some(modified) => writeln!(f, "  Modified: {}", modified.format("%Y-%m-%d %H:%M:%S"))?,
            None => writeln!(f, "  Modified: unknown")?,
        }
        match self.permissions {
            Some(bits) => writeln!(f, "  Permissions: {:03o}", bits)?,
            None => writeln!(f, "  Permissions: n/a")?,
        }

        writeln!(f)?;
        writeln!(f, "Archive Contents ({} files):", self.entry_count)?;
        for module in &self.modules {
            if module.is_dir {
                writeln!(f, "  ├─ {}/", module.name)?;
            } else {
                writeln!(f, "  ├─ {}", module.name)?;
            }
            for entry in module.examples() {
                writeln!(f, "  │  ├─ {}", entry)?;
            }
            if module.remaining() > 0 {
                writeln!(f, "  │  └─ ... and {} more", module.remaining())?;
            }
        }

        writeln!(f)?;
        writeln!(f, "AAB file is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, names: &[&str]) {
        let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        for name in names {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(name.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_entry_count_matches_central_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.aab");
        let names = [
            "BundleConfig.pb",
            "base/manifest/AndroidManifest.xml",
            "base/dex/classes.dex",
            "base/res/layout/main.xml",
            "feature/dex/classes.dex",
        ];
        write_zip(&path, &names);

        let report = BundleAnalyzer::analyze(&path).unwrap();
        assert_eq!(report.entry_count, names.len());
        assert_eq!(report.size, std::fs::metadata(&path).unwrap().len());

        let module_names: Vec<&str> = report.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(module_names, vec!["BundleConfig.pb", "base", "feature"]);

        let base = report.module("base").unwrap();
        assert!(base.is_dir);
        assert_eq!(base.entries.len(), 3);
        assert_eq!(base.entries[0], "base/dex/classes.dex");
        assert!(!report.module("BundleConfig.pb").unwrap().is_dir);
    }

    #[test]
    fn test_examples_are_truncated() {
        let entries: Vec<String> = (0..8).map(|i| format!("base/assets/file{}.bin", i)).collect();
        let modules = group_by_module(entries.iter().map(String::as_str));
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].examples().len(), MAX_EXAMPLES);
        assert_eq!(modules[0].remaining(), 3);
    }

    #[test]
    fn test_report_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo_app.aab");
        let names: Vec<String> = (0..7).map(|i| format!("base/lib/lib{}.so", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_zip(&path, &refs);

        let rendered = BundleAnalyzer::analyze(&path).unwrap().to_string();
        assert!(rendered.contains("AAB File Information: demo_app.aab"));
        assert!(rendered.contains("Archive Contents (7 files):"));
        assert!(rendered.contains("  ├─ base/"));
        assert!(rendered.contains("  │  ├─ base/lib/lib0.so"));
        assert!(!rendered.contains("lib5.so"));
        assert!(rendered.contains("... and 2 more"));
        assert_eq!(rendered.lines().last(), Some("AAB file is valid"));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.aab");
        std::fs::write(&path, "definitely not a zip archive").unwrap();

        let err = BundleAnalyzer::analyze(&path).unwrap_err();
        assert!(matches!(err, BuildError::InvalidArchive(..)));
        assert!(err.to_string().contains("not a valid archive"));
    }

    #[test]
    fn test_missing_file() {
        let err = BundleAnalyzer::analyze(Path::new("/nonexistent/app.aab")).unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(BundleAnalyzer::format_size(512), "512 bytes");
        assert_eq!(BundleAnalyzer::format_size(1536), "1.50 KB");
        assert_eq!(BundleAnalyzer::format_size(5 * 1024 * 1024), "5.00 MB");
    }
}

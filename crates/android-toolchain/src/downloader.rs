//! Bundletool Downloader
//!
//! Fetches the pinned bundletool jar into the tools directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Download progress callback: `(downloaded, total)`; `total` is 0 when unknown
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Download error types
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Capability: fetch a URL into a local file
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Stream `url` into `target`, returning the number of bytes written
    async fn fetch(
        &self,
        url: &str,
        target: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64, DownloadError>;
}

/// HTTPS source backed by reqwest
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apk2aab/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactSource for HttpSource {
    async fn fetch(
        &self,
        url: &str,
        target: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64, DownloadError> {
        use futures::StreamExt;

        info!("Downloading {} to {:?}", url, target);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::InvalidResponse(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;

        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(callback) = progress {
                callback(downloaded, total_size);
            }
        }

        file.flush().await?;
        Ok(downloaded)
    }
}

/// Outcome of [`BundletoolFetcher::ensure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent(PathBuf),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::AlreadyPresent(path) => path,
            FetchOutcome::Downloaded { path, .. } => path,
        }
    }
}

/// Ensures the bundletool jar exists locally
pub struct BundletoolFetcher {
    source: Box<dyn ArtifactSource>,
    jar_path: PathBuf,
    url: String,
    sha256: Option<String>,
}

impl BundletoolFetcher {
    pub fn new(source: Box<dyn ArtifactSource>, jar_path: PathBuf, url: String) -> Self {
        Self {
            source,
            jar_path,
            url,
            sha256: None,
        }
    }

    /// Verify the download against a hex SHA-256 digest
    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.map(|s| s.to_lowercase());
        self
    }

    /// Download unless the jar is already there.
    ///
    /// The body is written to `<jar>.part` and renamed once complete, so a
    /// failed download never leaves something that looks like a jar.
    pub async fn ensure(&self, progress: Option<ProgressCallback>) -> Result<FetchOutcome, DownloadError> {
        if self.jar_path.exists() {
            info!("Bundletool already exists at {:?}", self.jar_path);
            return Ok(FetchOutcome::AlreadyPresent(self.jar_path.clone()));
        }

        if let Some(parent) = self.jar_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(&self.jar_path);
        let result = self.download_to(&partial, progress.as_ref()).await;
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, &self.jar_path).await?;
        info!("Downloaded bundletool to {:?}", self.jar_path);

        Ok(FetchOutcome::Downloaded {
            path: self.jar_path.clone(),
            bytes,
        })
    }

    async fn download_to(&self, partial: &Path, progress: Option<&ProgressCallback>) -> Result<u64, DownloadError> {
        let bytes = self.source.fetch(&self.url, partial, progress).await?;

        if let Some(expected) = &self.sha256 {
            let actual = sha256_file(partial).await?;
            if &actual != expected {
                warn!("Checksum mismatch: expected {}, got {}", expected, actual);
                return Err(DownloadError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
            debug!("Checksum verified");
        }

        Ok(bytes)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Hex SHA-256 of a file
pub async fn sha256_file(path: &Path) -> Result<String, DownloadError> {
    let data = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Whole percentage, capped at 100; `None` when the total is unknown
pub fn progress_percent(downloaded: u64, total: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    Some((downloaded.saturating_mul(100) / total).min(100))
}

/// Console progress bar reporting the download percentage
pub fn console_progress() -> ProgressCallback {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("  Progress: {percent:>3}% [{bar:40}] {bytes}/{total_bytes}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);

    Box::new(move |downloaded, total| {
        if total > 0 && bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(downloaded);
        if progress_percent(downloaded, total) == Some(100) {
            bar.finish();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writes a fixed body and counts requests
    struct FakeSource {
        body: Vec<u8>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FakeSource {
        fn new(body: &[u8]) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                body: body.to_vec(),
                calls: calls.clone(),
                fail: false,
            };
            (source, calls)
        }
    }

    #[async_trait]
    impl ArtifactSource for FakeSource {
        async fn fetch(
            &self,
            _url: &str,
            target: &Path,
            progress: Option<&ProgressCallback>,
        ) -> Result<u64, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(target, &self.body[..self.body.len() / 2]).await?;
            if self.fail {
                return Err(DownloadError::InvalidResponse("HTTP 503".into()));
            }
            tokio::fs::write(target, &self.body).await?;
            if let Some(callback) = progress {
                callback(self.body.len() as u64, self.body.len() as u64);
            }
            Ok(self.body.len() as u64)
        }
    }

    const URL: &str = "https://example.invalid/bundletool-all.jar";

    #[tokio::test]
    async fn test_existing_jar_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("tools").join("bundletool.jar");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"existing").unwrap();

        let (source, calls) = FakeSource::new(b"new jar");
        let fetcher = BundletoolFetcher::new(Box::new(source), jar.clone(), URL.into());

        let outcome = fetcher.ensure(None).await.unwrap();
        assert_eq!(outcome, FetchOutcome::AlreadyPresent(jar.clone()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&jar).unwrap(), b"existing");
    }

    #[tokio::test]
    async fn test_download_creates_jar_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("tools").join("bundletool.jar");

        let (source, calls) = FakeSource::new(b"PK fake jar body");
        let fetcher = BundletoolFetcher::new(Box::new(source), jar.clone(), URL.into());

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_cb = seen.clone();
        let progress: ProgressCallback = Box::new(move |done, total| {
            if let Some(percent) = progress_percent(done, total) {
                seen_in_cb.store(percent as usize, Ordering::SeqCst);
            }
        });

        let outcome = fetcher.ensure(Some(progress)).await.unwrap();
        assert_eq!(outcome.path(), jar.as_path());
        assert!(matches!(outcome, FetchOutcome::Downloaded { bytes: 16, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 100);
        assert!(!partial_path(&jar).exists());

        // A second run is a no-op
        let outcome = fetcher.ensure(None).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::AlreadyPresent(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_jar() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("bundletool.jar");

        let (mut source, _) = FakeSource::new(b"truncated body");
        source.fail = true;
        let fetcher = BundletoolFetcher::new(Box::new(source), jar.clone(), URL.into());

        assert!(fetcher.ensure(None).await.is_err());
        assert!(!jar.exists());
        assert!(!partial_path(&jar).exists());
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("bundletool.jar");

        let (source, _) = FakeSource::new(b"tampered");
        let fetcher = BundletoolFetcher::new(Box::new(source), jar.clone(), URL.into())
            .with_sha256(Some("00".repeat(32)));

        let err = fetcher.ensure(None).await.unwrap_err();
        assert!(matches!(err, DownloadError::ChecksumMismatch { .. }));
        assert!(!jar.exists());
    }

    #[tokio::test]
    async fn test_checksum_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("bundletool.jar");
        let body = b"bundletool";

        let expected = hex::encode(Sha256::digest(body)).to_uppercase();
        let (source, _) = FakeSource::new(body);
        let fetcher = BundletoolFetcher::new(Box::new(source), jar.clone(), URL.into())
            .with_sha256(Some(expected));

        assert!(fetcher.ensure(None).await.is_ok());
        assert!(jar.exists());
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), None);
        assert_eq!(progress_percent(50, 200), Some(25));
        assert_eq!(progress_percent(300, 200), Some(100));
    }
}

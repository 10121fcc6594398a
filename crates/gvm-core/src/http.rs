use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use gvm_backend::{
    ArchiveFetcher, CatalogEntry, CatalogError, GoVersion, InstallError, ReleaseSource,
};
use gvm_platform::Platform;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_RELEASE_INDEX_URL: &str = "https://go.dev/dl/?mode=json&include=all";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://go.dev/dl/";

/// Network knobs shared by the release source and the archive fetcher.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub release_index_url: String,
    pub download_base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            release_index_url: DEFAULT_RELEASE_INDEX_URL.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(600),
        }
    }
}

fn build_client(
    timeout: Duration,
    connect_timeout: Duration,
    purpose: &str,
) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(format!("gvm/{}/{purpose}", env!("CARGO_PKG_VERSION")))
        .build()
}

#[derive(Debug, Deserialize)]
struct UpstreamRelease {
    version: String,
    #[serde(default)]
    files: Vec<UpstreamFile>,
}

#[derive(Debug, Deserialize)]
struct UpstreamFile {
    filename: String,
    #[serde(default)]
    os: String,
    #[serde(default)]
    arch: String,
    #[serde(default)]
    sha256: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    kind: String,
}

/// Map the upstream JSON index to catalog entries installable on `platform`.
///
/// Releases whose tag cannot be normalized are skipped with a warning.
/// Stability comes from the normalized version, not the upstream flag.
///
/// # Errors
/// Returns [`CatalogError::Unavailable`] when the body is not a release index.
pub fn entries_from_index(
    body: &str,
    platform: &Platform,
    download_base_url: &str,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let releases: Vec<UpstreamRelease> =
        serde_json::from_str(body).map_err(CatalogError::parse_from)?;
    let base = download_base_url.trim_end_matches('/');

    let mut entries = Vec::new();
    for release in releases {
        let version = match GoVersion::from_upstream(&release.version) {
            Ok(version) => version,
            Err(error) => {
                warn!("Skipping upstream release {}: {error}", release.version);
                continue;
            }
        };

        let Some(file) = release.files.into_iter().find(|file| {
            file.os == platform.os
                && file.arch == platform.arch
                && file.kind == "archive"
                && file.filename.ends_with(".tar.gz")
        }) else {
            continue;
        };

        let mut entry = CatalogEntry::new(
            version,
            format!("{base}/{}", file.filename),
            file.filename,
        );
        if !file.sha256.is_empty() {
            entry = entry.with_sha256(file.sha256.to_ascii_lowercase());
        }
        if file.size > 0 {
            entry = entry.with_size(file.size);
        }
        entries.push(entry);
    }

    debug!("Parsed {} releases for {platform}", entries.len());
    Ok(entries)
}

/// Release index served by go.dev.
pub struct GoDevReleaseSource {
    client: reqwest::Client,
    index_url: String,
    download_base_url: String,
    platform: Platform,
}

impl GoDevReleaseSource {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: &HttpOptions, platform: Platform) -> Result<Self, CatalogError> {
        let client = build_client(options.timeout, options.connect_timeout, "catalog")
            .map_err(CatalogError::request_from)?;
        Ok(Self {
            client,
            index_url: options.release_index_url.clone(),
            download_base_url: options.download_base_url.clone(),
            platform,
        })
    }
}

#[async_trait]
impl ReleaseSource for GoDevReleaseSource {
    fn name(&self) -> &str {
        &self.index_url
    }

    async fn fetch_releases(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        info!("Fetching release index from {}", self.index_url);
        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .map_err(CatalogError::request_from)?;

        if !response.status().is_success() {
            return Err(CatalogError::request(format!(
                "HTTP {} from {}",
                response.status(),
                self.index_url
            )));
        }

        let body = response.text().await.map_err(CatalogError::request_from)?;
        entries_from_index(&body, &self.platform, &self.download_base_url)
    }
}

/// Streams archives to disk over HTTP.
pub struct HttpArchiveFetcher {
    client: reqwest::Client,
}

impl HttpArchiveFetcher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: &HttpOptions) -> Result<Self, InstallError> {
        let client = build_client(options.download_timeout, options.connect_timeout, "download")
            .map_err(|error| InstallError::download("", error.to_string()))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        use futures_util::StreamExt;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| InstallError::download(url, error.to_string()))?;

        if !response.status().is_success() {
            return Err(InstallError::download(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
            InstallError::download(url, format!("create {}: {error}", dest.display()))
        })?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|error| InstallError::download(url, error.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|error| InstallError::download(url, format!("write: {error}")))?;
            downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|error| InstallError::download(url, format!("flush: {error}")))?;

        info!("Download complete: {downloaded} bytes");
        Ok(downloaded)
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        info!("Downloading {url}");
        let result = self.download(url, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }
}

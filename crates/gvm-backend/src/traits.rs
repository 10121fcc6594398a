use async_trait::async_trait;
use std::path::Path;

use crate::error::{CatalogError, InstallError};
use crate::types::CatalogEntry;

/// Upstream release index for the current platform.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch every installable release. Entries may arrive unsorted and
    /// with duplicates; the catalog normalizes them.
    async fn fetch_releases(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Transport for release archives.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Write the archive at `url` to `dest` and return the byte count.
    ///
    /// Non-2xx responses and transport errors map to
    /// [`InstallError::DownloadFailed`].
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<u64, InstallError>;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::types::GoVersion;

    struct MockSource {
        entries: Vec<CatalogEntry>,
    }

    #[async_trait]
    impl ReleaseSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        async fn fetch_releases(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
            if self.entries.is_empty() {
                return Err(CatalogError::request("no releases configured"));
            }
            Ok(self.entries.clone())
        }
    }

    struct MockFetcher {
        payloads: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl ArchiveFetcher for MockFetcher {
        async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
            let bytes = self
                .payloads
                .get(url)
                .ok_or_else(|| InstallError::download(url, "HTTP 404"))?;
            std::fs::write(dest, bytes)
                .map_err(|e| InstallError::download(url, e.to_string()))?;
            Ok(bytes.len() as u64)
        }
    }

    #[tokio::test]
    async fn release_source_is_object_safe() {
        let source: Box<dyn ReleaseSource> = Box::new(MockSource {
            entries: vec![CatalogEntry::new(
                GoVersion::new(1, 21, 5),
                "https://example.invalid/go1.21.5.tar.gz",
                "go1.21.5.tar.gz",
            )],
        });

        let entries = source.fetch_releases().await.expect("mock source should succeed");
        assert_eq!(source.name(), "mock");
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn release_source_errors_propagate() {
        let source: Box<dyn ReleaseSource> = Box::new(MockSource { entries: vec![] });
        let error = source
            .fetch_releases()
            .await
            .expect_err("empty mock should fail");
        assert!(matches!(error, CatalogError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn archive_fetcher_reports_missing_urls() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fetcher: Box<dyn ArchiveFetcher> = Box::new(MockFetcher {
            payloads: HashMap::from([("known".to_string(), b"payload".to_vec())]),
        });

        let written = fetcher
            .fetch_archive("known", &dir.path().join("a"))
            .await
            .expect("known url should download");
        assert_eq!(written, 7);

        let error = fetcher
            .fetch_archive("unknown", &dir.path().join("b"))
            .await
            .expect_err("unknown url should fail");
        assert!(matches!(error, InstallError::DownloadFailed { .. }));
    }
}

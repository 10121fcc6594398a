use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use gvm_backend::{CatalogEntry, CatalogError, GoVersion, ReleaseSource};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::fs::write_atomic;

/// The release catalog as of its last successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub entries: Vec<CatalogEntry>,
}

impl CatalogSnapshot {
    /// Build a snapshot with entries deduplicated by version and sorted
    /// ascending. The first entry seen for a version wins.
    #[must_use]
    pub fn new(fetched_at: DateTime<Utc>, entries: Vec<CatalogEntry>) -> Self {
        let mut by_version: BTreeMap<GoVersion, CatalogEntry> = BTreeMap::new();
        for mut entry in entries {
            entry.stable = entry.version.is_stable();
            by_version.entry(entry.version.clone()).or_insert(entry);
        }

        Self {
            fetched_at,
            entries: by_version.into_values().collect(),
        }
    }

    #[must_use]
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.fetched_at)
    }

    #[must_use]
    pub fn find(&self, version: &GoVersion) -> Option<&CatalogEntry> {
        self.entries
            .binary_search_by(|entry| entry.version.cmp(version))
            .ok()
            .map(|index| &self.entries[index])
    }

    #[must_use]
    pub fn latest_stable(&self) -> Option<&CatalogEntry> {
        self.entries.iter().rev().find(|entry| entry.stable)
    }
}

/// Cached view of the upstream release index.
///
/// Reading never touches the network; only [`Catalog::refresh`] does.
pub struct Catalog {
    cache_file: PathBuf,
}

impl Catalog {
    #[must_use]
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
        }
    }

    /// Fetch the upstream index. Nothing is persisted.
    ///
    /// # Errors
    /// Propagates the source's [`CatalogError::Unavailable`].
    pub async fn fetch(&self, source: &dyn ReleaseSource) -> Result<CatalogSnapshot, CatalogError> {
        let entries = source.fetch_releases().await?;
        Ok(CatalogSnapshot::new(Utc::now(), entries))
    }

    /// Read the cached snapshot. A missing cache is `Ok(None)`.
    ///
    /// # Errors
    /// Returns [`CatalogError::CorruptCache`] when the file exists but cannot
    /// be decoded, or an IO error when it cannot be read.
    pub fn load_cache(&self) -> Result<Option<CatalogSnapshot>, CatalogError> {
        let data = match std::fs::read(&self.cache_file) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("No catalog cache at {}", self.cache_file.display());
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };

        let snapshot: CatalogSnapshot =
            serde_json::from_slice(&data).map_err(|error| CatalogError::CorruptCache {
                details: error.to_string(),
            })?;
        Ok(Some(CatalogSnapshot::new(snapshot.fetched_at, snapshot.entries)))
    }

    /// Persist a snapshot atomically.
    ///
    /// # Errors
    /// Returns an IO error if the cache directory or file cannot be written.
    pub fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), CatalogError> {
        if let Some(parent) = self.cache_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(snapshot).map_err(|error| CatalogError::Io {
            kind: std::io::ErrorKind::InvalidData,
            message: error.to_string(),
        })?;
        write_atomic(&self.cache_file, &data)?;
        Ok(())
    }

    /// Fetch and persist. On failure the previous cache is left untouched.
    ///
    /// # Errors
    /// Returns the fetch error, or an IO error if saving fails.
    pub async fn refresh(
        &self,
        source: &dyn ReleaseSource,
    ) -> Result<CatalogSnapshot, CatalogError> {
        let snapshot = self.fetch(source).await?;
        self.save(&snapshot)?;
        info!(
            "Catalog updated from {}: {} releases",
            source.name(),
            snapshot.entries.len()
        );
        Ok(snapshot)
    }
}

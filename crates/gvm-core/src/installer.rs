use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use gvm_backend::{ArchiveFetcher, CatalogEntry, InstallError, InstallStage, InstalledVersion};
use gvm_platform::GvmPaths;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::activator::{ActivationOutcome, Activator};

/// Scratch entries older than this are leftovers from killed processes.
pub const STALE_SCRATCH_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const SCRATCH_PREFIX: &str = ".install-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub installed: InstalledVersion,
    /// The target already existed, either beforehand or because a concurrent
    /// install published it first.
    pub already_installed: bool,
    pub activation: Option<ActivationOutcome>,
}

/// Downloads, verifies, extracts and publishes a toolchain. Nothing becomes
/// visible under `versions/` until the final rename.
pub struct Installer<'a> {
    paths: &'a GvmPaths,
    fetcher: &'a dyn ArchiveFetcher,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(paths: &'a GvmPaths, fetcher: &'a dyn ArchiveFetcher) -> Self {
        Self { paths, fetcher }
    }

    /// Install the release described by `entry`, optionally activating it.
    ///
    /// # Errors
    /// Returns [`InstallError::DownloadFailed`], [`InstallError::IntegrityError`]
    /// or [`InstallError::FilesystemError`] for the failing step. Scratch files
    /// are removed on every exit path.
    pub async fn install(
        &self,
        entry: &CatalogEntry,
        activate_after: bool,
    ) -> Result<InstallOutcome, InstallError> {
        let name = entry.version.to_string();
        let target = self.paths.version_dir(&name);

        let already_installed = if target.is_dir() {
            info!("Go {name} is already installed");
            true
        } else {
            self.download_and_publish(entry, &target).await?
        };

        let activator = Activator::new(self.paths.clone());
        let activation = if activate_after {
            Some(activator.activate(&entry.version)?)
        } else {
            None
        };
        let is_active = activator.current_version()?.as_ref() == Some(&entry.version);
        let installed_at = std::fs::metadata(&target)
            .and_then(|metadata| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(InstallOutcome {
            installed: InstalledVersion {
                version: entry.version.clone(),
                path: target,
                installed_at,
                is_active,
            },
            already_installed,
            activation,
        })
    }

    /// Returns `true` when a concurrent install won the publish rename.
    async fn download_and_publish(
        &self,
        entry: &CatalogEntry,
        target: &Path,
    ) -> Result<bool, InstallError> {
        let prepare =
            |error: std::io::Error| InstallError::filesystem(InstallStage::Prepare, &error);

        std::fs::create_dir_all(self.paths.versions_dir()).map_err(prepare)?;
        let scratch_root = self.paths.scratch_dir();
        std::fs::create_dir_all(&scratch_root).map_err(prepare)?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&scratch_root)
            .map_err(prepare)?;

        let archive_path = scratch.path().join(archive_file_name(&entry.filename));
        let downloaded = self.fetcher.fetch_archive(&entry.url, &archive_path).await?;
        debug!("Fetched {downloaded} bytes into {}", archive_path.display());

        verify_archive(entry, &archive_path)?;

        let staging = scratch.path().join("staging");
        std::fs::create_dir_all(&staging)
            .map_err(|error| InstallError::filesystem(InstallStage::Extract, &error))?;
        let extracted = extract_tar_gz(&archive_path, &staging)
            .map_err(|error| InstallError::filesystem(InstallStage::Extract, &error))?;
        debug!("Extracted {extracted} entries for {}", entry.version);

        let payload = payload_root(&staging)
            .map_err(|error| InstallError::filesystem(InstallStage::Extract, &error))?;

        let raced = match std::fs::rename(&payload, target) {
            Ok(()) => {
                info!("Installed Go {} to {}", entry.version, target.display());
                false
            }
            Err(_) if target.is_dir() => {
                info!("Go {} was installed concurrently", entry.version);
                true
            }
            Err(error) => return Err(InstallError::filesystem(InstallStage::Publish, &error)),
        };

        if let Err(error) = scratch.close() {
            warn!("Failed to clean install scratch: {error}");
        }
        Ok(raced)
    }
}

/// Check size and checksum when the catalog provides them.
///
/// # Errors
/// Returns [`InstallError::IntegrityError`] on mismatch, or a filesystem
/// error if the archive cannot be read.
pub fn verify_archive(entry: &CatalogEntry, archive: &Path) -> Result<(), InstallError> {
    let verify = |error: std::io::Error| InstallError::filesystem(InstallStage::Verify, &error);

    if let Some(expected) = entry.size {
        let actual = std::fs::metadata(archive).map_err(verify)?.len();
        if actual != expected {
            return Err(InstallError::integrity(
                &entry.filename,
                format!("expected {expected} bytes, got {actual}"),
            ));
        }
    }

    if let Some(expected) = &entry.sha256 {
        let actual = sha256_file(archive).map_err(verify)?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(InstallError::integrity(
                &entry.filename,
                format!("expected sha256 {expected}, got {actual}"),
            ));
        }
        info!("Checksum verified for {}", entry.filename);
    }

    Ok(())
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Unpack a `.tar.gz` into `dest`, skipping entries that would land outside
/// it. Returns the number of entries written.
fn extract_tar_gz(archive: &Path, dest: &Path) -> std::io::Result<usize> {
    let file = std::fs::File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);

    let mut written = 0;
    for entry in tar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if !is_safe_entry_path(&path) {
            warn!("Skipping archive entry with unsafe path {}", path.display());
            continue;
        }
        if entry.unpack_in(dest)? {
            written += 1;
        }
    }

    if written == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "archive contains no files",
        ));
    }
    Ok(written)
}

fn is_safe_entry_path(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Release archives wrap everything in a single top-level directory; unwrap
/// it so `versions/<v>/bin/go` exists.
fn payload_root(staging: &Path) -> std::io::Result<PathBuf> {
    let mut entries = std::fs::read_dir(staging)?.collect::<Result<Vec<_>, _>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        if let Some(only) = entries.pop() {
            return Ok(only.path());
        }
    }
    Ok(staging.to_path_buf())
}

fn archive_file_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "..")
        .unwrap_or("archive.tar.gz")
}

/// Remove scratch entries older than `max_age`. Returns how many were
/// removed.
pub fn cleanup_stale_scratch(paths: &GvmPaths, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(paths.scratch_dir()) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_stale = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > max_age);
        if !is_stale {
            continue;
        }

        let path = entry.path();
        debug!("Cleaning up stale scratch entry: {}", path.display());
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(error) => warn!("Failed to remove {}: {error}", path.display()),
        }
    }
    removed
}

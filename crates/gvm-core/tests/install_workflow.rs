use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use gvm_backend::{
    ActivationError, ArchiveFetcher, CatalogEntry, CatalogError, GoVersion, GvmError,
    InstallError, InstallStage, RegistryError, ReleaseSource, ResolutionError, VersionSpec,
};
use gvm_core::{ActivationOutcome, Manager, Target};
use gvm_platform::GvmPaths;
use sha2::{Digest, Sha256};

struct StaticSource {
    entries: Vec<CatalogEntry>,
}

#[async_trait]
impl ReleaseSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_releases(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.entries.clone())
    }
}

struct CountingSource {
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl ReleaseSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch_releases(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

struct MemoryFetcher {
    payloads: HashMap<String, Vec<u8>>,
    /// Simulates another process publishing this directory mid-download.
    publish_during_fetch: Option<PathBuf>,
}

#[async_trait]
impl ArchiveFetcher for MemoryFetcher {
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        let bytes = self
            .payloads
            .get(url)
            .ok_or_else(|| InstallError::download(url, "HTTP 404 Not Found"))?;
        std::fs::write(dest, bytes).map_err(|e| InstallError::download(url, e.to_string()))?;

        if let Some(dir) = &self.publish_during_fetch {
            std::fs::create_dir_all(dir.join("bin")).expect("racing install should be created");
            std::fs::write(dir.join("bin").join("go"), "winner").expect("racing file");
        }
        Ok(bytes.len() as u64)
    }
}

fn toolchain_archive(version: &str) -> Vec<u8> {
    let files: [(&str, Vec<u8>); 2] = [
        ("go/bin/go", b"#!/bin/sh\necho go\n".to_vec()),
        ("go/VERSION", format!("go{version}\n").into_bytes()),
    ];

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in &files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, path, data.as_slice())
            .expect("entry should be appended");
    }
    builder
        .into_inner()
        .expect("tar should finish")
        .finish()
        .expect("gzip should finish")
}

fn url_for(version: &str) -> String {
    format!("mem://go{version}.linux-amd64.tar.gz")
}

fn entry_for(version: &str, payload: &[u8]) -> CatalogEntry {
    let parsed: GoVersion = version.parse().expect("test version should parse");
    CatalogEntry::new(parsed, url_for(version), format!("go{version}.linux-amd64.tar.gz"))
        .with_sha256(format!("{:x}", Sha256::digest(payload)))
        .with_size(payload.len() as u64)
}

struct Fixture {
    _temp: tempfile::TempDir,
    paths: GvmPaths,
    manager: Manager,
}

async fn fixture_with(
    catalog: Vec<(&str, Vec<u8>, Option<CatalogEntry>)>,
    race_version: Option<&str>,
) -> Fixture {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let paths = GvmPaths::new(temp.path().join("gvm"));
    paths.ensure_dirs().expect("layout should be created");

    let mut entries = Vec::new();
    let mut payloads = HashMap::new();
    for (version, payload, entry) in catalog {
        entries.push(entry.unwrap_or_else(|| entry_for(version, &payload)));
        payloads.insert(url_for(version), payload);
    }

    let manager = Manager::new(
        paths.clone(),
        Box::new(StaticSource { entries }),
        Box::new(MemoryFetcher {
            payloads,
            publish_during_fetch: race_version.map(|version| paths.version_dir(version)),
        }),
    );
    manager
        .update_catalog()
        .await
        .expect("catalog refresh should succeed");

    Fixture {
        _temp: temp,
        paths,
        manager,
    }
}

async fn standard_fixture() -> Fixture {
    fixture_with(
        vec![
            ("1.21.0", toolchain_archive("1.21.0"), None),
            ("1.21.5", toolchain_archive("1.21.5"), None),
            ("1.21.5-rc1", toolchain_archive("1.21.5rc1"), None),
            ("1.22.0-rc1", toolchain_archive("1.22rc1"), None),
        ],
        None,
    )
    .await
}

fn spec(text: &str) -> VersionSpec {
    text.parse().expect("test spec should parse")
}

fn scratch_is_empty(paths: &GvmPaths) -> bool {
    std::fs::read_dir(paths.scratch_dir())
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

fn installed(manager: &Manager) -> Vec<String> {
    manager
        .list_installed(None)
        .expect("list should succeed")
        .iter()
        .map(|installed| installed.version.to_string())
        .collect()
}

#[tokio::test]
async fn install_publishes_unwrapped_toolchain() {
    let fx = standard_fixture().await;

    let outcome = fx
        .manager
        .install(&spec("1.21.5"), false)
        .await
        .expect("install should succeed");

    assert!(!outcome.already_installed);
    assert_eq!(outcome.installed.path, fx.paths.version_dir("1.21.5"));
    assert!(fx.paths.version_dir("1.21.5").join("bin").join("go").is_file());
    assert_eq!(installed(&fx.manager), vec!["1.21.5"]);
    assert!(scratch_is_empty(&fx.paths));
}

#[tokio::test]
async fn install_is_idempotent() {
    let fx = standard_fixture().await;

    fx.manager
        .install(&spec("1.21.5"), false)
        .await
        .expect("first install should succeed");
    let second = fx
        .manager
        .install(&spec("1.21.5"), false)
        .await
        .expect("second install should succeed");

    assert!(second.already_installed);
    assert_eq!(installed(&fx.manager), vec!["1.21.5"]);
}

#[tokio::test]
async fn wildcard_install_picks_latest_match() {
    let fx = standard_fixture().await;

    let outcome = fx
        .manager
        .install(&spec("1.21.*"), false)
        .await
        .expect("install should succeed");

    assert_eq!(outcome.installed.version, GoVersion::new(1, 21, 5));
    assert_eq!(
        fx.manager
            .resolve(&spec("stable:*"), Target::Remote)
            .expect("remote resolution should succeed"),
        GoVersion::new(1, 21, 5)
    );
}

#[tokio::test]
async fn corrupt_archive_leaves_registry_untouched() {
    let garbage = b"this is not a gzip stream".to_vec();
    let fx = fixture_with(vec![("1.21.5", garbage, None)], None).await;

    let error = fx
        .manager
        .install(&spec("1.21.5"), false)
        .await
        .expect_err("corrupt archive should fail");

    assert!(matches!(
        error,
        GvmError::Install(InstallError::FilesystemError {
            stage: InstallStage::Extract,
            ..
        })
    ));
    assert!(!fx.paths.version_dir("1.21.5").exists());
    assert!(installed(&fx.manager).is_empty());
    assert!(scratch_is_empty(&fx.paths));
}

#[tokio::test]
async fn checksum_mismatch_is_an_integrity_error() {
    let payload = toolchain_archive("1.21.5");
    let mut entry = entry_for("1.21.5", &payload);
    entry.sha256 = Some("0".repeat(64));
    let fx = fixture_with(vec![("1.21.5", payload, Some(entry))], None).await;

    let error = fx
        .manager
        .install(&spec("1.21.5"), true)
        .await
        .expect_err("tampered archive should fail");

    assert!(matches!(
        error,
        GvmError::Install(InstallError::IntegrityError { .. })
    ));
    assert!(installed(&fx.manager).is_empty());
    assert_eq!(fx.manager.current().expect("read should succeed"), None);
    assert!(scratch_is_empty(&fx.paths));
}

#[tokio::test]
async fn download_failure_is_reported() {
    let payload = toolchain_archive("1.21.5");
    let mut entry = entry_for("1.21.5", &payload);
    entry.url = "mem://missing".to_string();
    let fx = fixture_with(vec![("1.21.5", payload, Some(entry))], None).await;

    let error = fx
        .manager
        .install(&spec("1.21.5"), false)
        .await
        .expect_err("missing download should fail");

    assert!(matches!(
        error,
        GvmError::Install(InstallError::DownloadFailed { ref url, .. }) if url == "mem://missing"
    ));
    assert!(scratch_is_empty(&fx.paths));
}

#[tokio::test]
async fn exact_version_missing_from_catalog() {
    let fx = standard_fixture().await;

    let error = fx
        .manager
        .install(&spec("1.19.13"), false)
        .await
        .expect_err("unknown version should fail");

    assert_eq!(
        error,
        GvmError::Install(InstallError::NotInCatalog {
            version: "1.19.13".to_string()
        })
    );
}

#[tokio::test]
async fn losing_a_publish_race_is_success() {
    let payload = toolchain_archive("1.21.5");
    let fx = fixture_with(vec![("1.21.5", payload, None)], Some("1.21.5")).await;

    let outcome = fx
        .manager
        .install(&spec("1.21.5"), false)
        .await
        .expect("race loser should succeed");

    assert!(outcome.already_installed);
    let winner = std::fs::read_to_string(fx.paths.version_dir("1.21.5").join("bin").join("go"))
        .expect("winner's file should remain");
    assert_eq!(winner, "winner");
    assert!(scratch_is_empty(&fx.paths));
}

#[tokio::test]
async fn install_and_use_activates_once() {
    let fx = standard_fixture().await;

    let outcome = fx
        .manager
        .install(&spec("1.21.5"), true)
        .await
        .expect("install should succeed");
    assert_eq!(outcome.activation, Some(ActivationOutcome::Activated));
    assert!(outcome.installed.is_active);

    let (version, again) = fx
        .manager
        .activate(&spec("1.21.5"))
        .expect("activation should succeed");
    assert_eq!(version, GoVersion::new(1, 21, 5));
    assert_eq!(again, ActivationOutcome::AlreadyActive);

    let current = fx
        .manager
        .current()
        .expect("read should succeed")
        .expect("a version should be active");
    assert_eq!(current.version, GoVersion::new(1, 21, 5));
}

#[tokio::test]
async fn activating_missing_version_fails() {
    let fx = standard_fixture().await;

    let error = fx
        .manager
        .activate(&spec("1.21.5"))
        .expect_err("activation should fail");

    assert_eq!(
        error,
        GvmError::Activation(ActivationError::NotInstalled {
            version: "1.21.5".to_string()
        })
    );

    let stable = fx
        .manager
        .activate(&spec("stable:1.21.5"))
        .expect_err("activation should fail");
    assert_eq!(stable, error);

    assert!(matches!(
        fx.manager.activate(&spec("stable:1.21.5-rc1")),
        Err(GvmError::Resolution(ResolutionError::NoMatch { .. }))
    ));
}

#[tokio::test]
async fn install_without_cached_catalog_stays_offline() {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let paths = GvmPaths::new(temp.path().join("gvm"));
    let fetches = Arc::new(AtomicUsize::new(0));
    let manager = Manager::new(
        paths.clone(),
        Box::new(CountingSource {
            fetches: Arc::clone(&fetches),
        }),
        Box::new(MemoryFetcher {
            payloads: HashMap::new(),
            publish_during_fetch: None,
        }),
    );

    for text in ["1.21.*", "1.21.5"] {
        let error = manager
            .install(&spec(text), false)
            .await
            .expect_err("install should fail without a catalog");
        assert!(matches!(
            error,
            GvmError::Install(InstallError::NotInCatalog { .. })
        ));
    }
    assert!(manager.list_remote(None).expect("listing should succeed").is_empty());
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    assert!(!paths.catalog_file().exists());
}

#[tokio::test]
async fn removing_active_version_requires_force() {
    let fx = standard_fixture().await;
    fx.manager
        .install(&spec("1.21.5"), true)
        .await
        .expect("install should succeed");

    let error = fx
        .manager
        .remove(&spec("1.21.5"), false)
        .expect_err("removal without force should fail");
    assert!(matches!(
        error,
        GvmError::Registry(RegistryError::ActiveVersionInUse { .. })
    ));
    assert_eq!(installed(&fx.manager), vec!["1.21.5"]);

    fx.manager
        .remove(&spec("1.21.5"), true)
        .expect("forced removal should succeed");
    assert!(installed(&fx.manager).is_empty());
    assert_eq!(fx.manager.current().expect("read should succeed"), None);
}

#[tokio::test]
async fn alias_cycle_leaves_aliases_unchanged() {
    let fx = standard_fixture().await;

    fx.manager
        .add_alias("a", &spec("b"))
        .expect("first alias should be accepted");
    let error = fx
        .manager
        .add_alias("b", &spec("a"))
        .expect_err("cycle should be rejected");

    assert!(matches!(
        error,
        GvmError::Registry(RegistryError::Resolution(ResolutionError::AliasCycle { .. }))
    ));
    let aliases = fx.manager.list_aliases().expect("aliases should load");
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases["a"], spec("b"));
}

#[tokio::test]
async fn aliases_drive_install_and_listing() {
    let fx = standard_fixture().await;
    fx.manager
        .add_alias("edge", &spec("1.22.*"))
        .expect("alias should be accepted");

    let outcome = fx
        .manager
        .install(&spec("edge"), false)
        .await
        .expect("alias install should succeed");
    assert_eq!(outcome.installed.version.to_string(), "1.22.0-rc1");

    let listed = fx
        .manager
        .list_remote(Some(&spec("1.21.*")))
        .expect("remote listing should succeed");
    let rendered: Vec<(String, bool)> = listed
        .iter()
        .map(|listing| (listing.entry.version.to_string(), listing.installed))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("1.21.0".to_string(), false),
            ("1.21.5-rc1".to_string(), false),
            ("1.21.5".to_string(), false),
        ]
    );

    let edge_listing = fx
        .manager
        .list_remote(Some(&spec("edge")))
        .expect("alias listing should succeed");
    assert!(edge_listing[0].installed);
}

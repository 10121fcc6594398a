use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the default root directory.
pub const ROOT_ENV_VAR: &str = "GVM_DIR";

const DEFAULT_ROOT_DIR: &str = ".gvm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
}

/// Handle on the single on-disk root every component works against.
///
/// Nothing in the workspace reads process-wide state for paths: the handle
/// is built once by the caller and passed by reference into each component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvmPaths {
    root: PathBuf,
}

impl GvmPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root from `$GVM_DIR`, falling back to `~/.gvm`.
    ///
    /// # Errors
    /// Returns an error when `$GVM_DIR` is unset and the home directory
    /// cannot be determined.
    pub fn from_env() -> Result<Self, PathsError> {
        if let Some(dir) = std::env::var_os(ROOT_ENV_VAR).filter(|value| !value.is_empty()) {
            log::debug!("Using {ROOT_ENV_VAR}={}", Path::new(&dir).display());
            return Ok(Self::new(dir));
        }

        let home = dirs::home_dir().ok_or(PathsError::HomeDirUnavailable)?;
        Ok(Self::new(home.join(DEFAULT_ROOT_DIR)))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    #[must_use]
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    #[must_use]
    pub fn catalog_file(&self) -> PathBuf {
        self.cache_dir().join("catalog.json")
    }

    #[must_use]
    pub fn build_cache_dir(&self, version: &str) -> PathBuf {
        self.cache_dir().join("go-build").join(version)
    }

    #[must_use]
    pub fn aliases_dir(&self) -> PathBuf {
        self.root.join("aliases")
    }

    #[must_use]
    pub fn alias_file(&self, name: &str) -> PathBuf {
        self.aliases_dir().join(name)
    }

    /// Single-line marker naming the active version.
    #[must_use]
    pub fn current_file(&self) -> PathBuf {
        self.root.join("current")
    }

    /// Stable symlink redirected to the active version's install directory.
    #[must_use]
    pub fn current_link(&self) -> PathBuf {
        self.root.join("go")
    }

    #[must_use]
    pub fn environment_dir(&self) -> PathBuf {
        self.root.join("environment")
    }

    #[must_use]
    pub fn environment_file(&self) -> PathBuf {
        self.environment_dir().join("go.env")
    }

    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    #[must_use]
    pub fn package_dir(&self, version: &str) -> PathBuf {
        self.packages_dir().join(version)
    }

    /// Scratch space for downloads, staging and removal. Lives under the root
    /// so renames into `versions/` never cross a filesystem boundary.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    #[must_use]
    pub fn init_script(&self) -> PathBuf {
        self.root.join("init-shell")
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs").join("gvm.log")
    }

    /// Ensure the directory skeleton exists on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.versions_dir(),
            self.cache_dir(),
            self.aliases_dir(),
            self.environment_dir(),
            self.packages_dir(),
            self.scratch_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

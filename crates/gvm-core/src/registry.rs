use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use gvm_backend::{GoVersion, InstalledVersion, RegistryError, VersionSpec, validate_alias_name};
use gvm_platform::GvmPaths;
use log::{debug, info, warn};

use crate::activator::Activator;
use crate::fs::write_atomic;
use crate::resolver::Resolver;

/// Installed toolchains, aliases and the active pointer, read from disk on
/// every call.
#[derive(Debug, Clone)]
pub struct Registry {
    paths: GvmPaths,
    activator: Activator,
}

impl Registry {
    #[must_use]
    pub fn new(paths: GvmPaths) -> Self {
        let activator = Activator::new(paths.clone());
        Self { paths, activator }
    }

    #[must_use]
    pub fn activator(&self) -> &Activator {
        &self.activator
    }

    /// Installed versions, ascending. Directory names that are not versions
    /// are skipped.
    ///
    /// # Errors
    /// Returns an error if the versions directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<InstalledVersion>, RegistryError> {
        let active = self.activator.current_version()?;
        let dir = self.paths.versions_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut installed = Vec::new();
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Ok(version) = name.parse::<GoVersion>() else {
                debug!("Skipping non-version directory {name}");
                continue;
            };
            // A directory only counts under its canonical name.
            if version.to_string() != name {
                debug!("Skipping non-canonical directory {name}");
                continue;
            }

            let installed_at = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            installed.push(InstalledVersion {
                is_active: active.as_ref() == Some(&version),
                path: entry.path(),
                version,
                installed_at,
            });
        }

        installed.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(installed)
    }

    #[must_use]
    pub fn is_installed(&self, version: &GoVersion) -> bool {
        self.install_dir(version).is_dir()
    }

    #[must_use]
    pub fn install_dir(&self, version: &GoVersion) -> PathBuf {
        self.paths.version_dir(&version.to_string())
    }

    /// The active version, if the pointer names one that is still installed.
    ///
    /// # Errors
    /// Returns an error if the registry cannot be read.
    pub fn get_active(&self) -> Result<Option<InstalledVersion>, RegistryError> {
        let Some(active) = self.activator.current_version()? else {
            return Ok(None);
        };

        let found = self
            .list()?
            .into_iter()
            .find(|installed| installed.version == active);
        if found.is_none() {
            warn!("Active pointer names {active}, which is not installed");
        }
        Ok(found)
    }

    /// Every alias with its target. Hidden files are ignored.
    ///
    /// # Errors
    /// Returns [`RegistryError::CorruptAlias`] when an alias file does not hold
    /// a valid spec.
    pub fn list_aliases(&self) -> Result<BTreeMap<String, VersionSpec>, RegistryError> {
        let dir = self.paths.aliases_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(error) => return Err(error.into()),
        };

        let mut aliases = BTreeMap::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !entry.path().is_file() {
                continue;
            }

            let content = std::fs::read_to_string(entry.path())?;
            let spec = content
                .trim()
                .parse::<VersionSpec>()
                .map_err(|error| RegistryError::CorruptAlias {
                    name: name.to_string(),
                    details: error.to_string(),
                })?;
            aliases.insert(name.to_string(), spec);
        }

        Ok(aliases)
    }

    /// # Errors
    /// Same as [`Registry::list_aliases`].
    pub fn resolver(&self) -> Result<Resolver, RegistryError> {
        Ok(Resolver::new(self.list_aliases()?))
    }

    /// Define or redefine `name`. The registry is unchanged on error.
    ///
    /// # Errors
    /// Returns a parse error for an invalid name and
    /// [`gvm_backend::ResolutionError::AliasCycle`] when the definition would
    /// make `name` reach itself.
    pub fn add_alias(&self, name: &str, target: &VersionSpec) -> Result<(), RegistryError> {
        validate_alias_name(name)?;
        self.resolver()?.check_alias(name, target)?;

        std::fs::create_dir_all(self.paths.aliases_dir())?;
        write_atomic(
            &self.paths.alias_file(name),
            format!("{target}\n").as_bytes(),
        )?;
        info!("Alias {name} -> {target}");
        Ok(())
    }

    /// # Errors
    /// Returns [`RegistryError::NotFound`] if no such alias exists.
    pub fn remove_alias(&self, name: &str) -> Result<(), RegistryError> {
        validate_alias_name(name)?;
        match std::fs::remove_file(self.paths.alias_file(name)) {
            Ok(()) => {
                info!("Removed alias {name}");
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(RegistryError::NotFound {
                    what: format!("alias {name}"),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Uninstall `version`. Removing the active version requires `force` and
    /// leaves no version active.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] if the version is not installed and
    /// [`RegistryError::ActiveVersionInUse`] if it is active and `force` is
    /// false.
    pub fn remove(&self, version: &GoVersion, force: bool) -> Result<(), RegistryError> {
        let name = version.to_string();
        let install_dir = self.paths.version_dir(&name);
        if !install_dir.is_dir() {
            return Err(RegistryError::NotFound {
                what: format!("version {name}"),
            });
        }

        let is_active = self.activator.current_version()?.as_ref() == Some(version);
        if is_active && !force {
            return Err(RegistryError::ActiveVersionInUse { version: name });
        }

        // `current` must never name a parked version.
        if is_active {
            self.activator.deactivate()?;
        }

        let scratch = self.paths.scratch_dir();
        std::fs::create_dir_all(&scratch)?;
        let trash = tempfile::Builder::new()
            .prefix(&format!(".remove-{name}-"))
            .tempdir_in(&scratch)?;
        let parked = trash.path().join(&name);
        std::fs::rename(&install_dir, &parked)?;

        if let Err(error) = trash.close() {
            warn!("Failed to delete removed toolchain {name}: {error}");
        }

        info!("Removed Go {name}");
        Ok(())
    }
}

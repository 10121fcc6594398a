use std::collections::{BTreeMap, BTreeSet};

use gvm_backend::{
    ArchiveFetcher, CatalogEntry, GoVersion, GvmError, InstallError, InstalledVersion,
    ReleaseSource, ResolutionError, VersionSpec, Versioned,
};
use gvm_platform::GvmPaths;
use log::debug;

use crate::activator::ActivationOutcome;
use crate::catalog::{Catalog, CatalogSnapshot};
use crate::installer::{InstallOutcome, Installer, STALE_SCRATCH_AGE, cleanup_stale_scratch};
use crate::registry::Registry;
use crate::resolver::{Expanded, Resolver};

/// Which universe a spec is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteListing {
    pub entry: CatalogEntry,
    pub installed: bool,
}

impl Versioned for RemoteListing {
    fn version(&self) -> &GoVersion {
        &self.entry.version
    }
}

/// Entry point for every user-facing command.
pub struct Manager {
    paths: GvmPaths,
    catalog: Catalog,
    registry: Registry,
    source: Box<dyn ReleaseSource>,
    fetcher: Box<dyn ArchiveFetcher>,
}

impl Manager {
    #[must_use]
    pub fn new(
        paths: GvmPaths,
        source: Box<dyn ReleaseSource>,
        fetcher: Box<dyn ArchiveFetcher>,
    ) -> Self {
        Self {
            catalog: Catalog::new(paths.catalog_file()),
            registry: Registry::new(paths.clone()),
            paths,
            source,
            fetcher,
        }
    }

    #[must_use]
    pub fn paths(&self) -> &GvmPaths {
        &self.paths
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Fetch the upstream index and replace the cache.
    ///
    /// # Errors
    /// Returns a catalog error if the fetch or the save fails; the previous
    /// cache is kept in either case.
    pub async fn update_catalog(&self) -> Result<CatalogSnapshot, GvmError> {
        Ok(self.catalog.refresh(self.source.as_ref()).await?)
    }

    /// The cached catalog, never touching the network.
    ///
    /// # Errors
    /// Returns an error if the cache exists but is unreadable.
    pub fn catalog_snapshot(&self) -> Result<Option<CatalogSnapshot>, GvmError> {
        Ok(self.catalog.load_cache()?)
    }

    fn cached_entries(&self) -> Result<Vec<CatalogEntry>, GvmError> {
        Ok(self
            .catalog_snapshot()?
            .map(|snapshot| snapshot.entries)
            .unwrap_or_default())
    }

    fn resolver(&self) -> Result<Resolver, GvmError> {
        Ok(self.registry.resolver()?)
    }

    /// Cached remote releases, optionally filtered, ascending.
    ///
    /// # Errors
    /// Returns a resolution error when the filter matches nothing.
    pub fn list_remote(
        &self,
        filter: Option<&VersionSpec>,
    ) -> Result<Vec<RemoteListing>, GvmError> {
        let installed: BTreeSet<GoVersion> = self
            .registry
            .list()?
            .into_iter()
            .map(|installed| installed.version)
            .collect();
        let listings: Vec<RemoteListing> = self
            .cached_entries()?
            .into_iter()
            .map(|entry| RemoteListing {
                installed: installed.contains(&entry.version),
                entry,
            })
            .collect();

        self.filtered(filter, listings)
    }

    /// Installed versions, optionally filtered, ascending.
    ///
    /// # Errors
    /// Returns a resolution error when the filter matches nothing.
    pub fn list_installed(
        &self,
        filter: Option<&VersionSpec>,
    ) -> Result<Vec<InstalledVersion>, GvmError> {
        let installed = self.registry.list()?;
        self.filtered(filter, installed)
    }

    fn filtered<T: Versioned + Clone>(
        &self,
        filter: Option<&VersionSpec>,
        items: Vec<T>,
    ) -> Result<Vec<T>, GvmError> {
        let Some(filter) = filter else {
            return Ok(items);
        };
        Ok(self
            .resolver()?
            .resolve_all(filter, &items)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// The single version `spec` selects in `target`.
    ///
    /// # Errors
    /// Returns a resolution error when nothing matches.
    pub fn resolve(&self, spec: &VersionSpec, target: Target) -> Result<GoVersion, GvmError> {
        let resolver = self.resolver()?;
        let version = match target {
            Target::Remote => resolver.resolve(spec, &self.cached_entries()?)?.version.clone(),
            Target::Local => resolver.resolve(spec, &self.registry.list()?)?.version.clone(),
        };
        debug!("Resolved {spec} ({target:?}) to {version}");
        Ok(version)
    }

    /// The exact version `spec` names once aliases are expanded, or `None`
    /// when it is a pattern.
    fn exact_version(&self, spec: &VersionSpec) -> Result<Option<GoVersion>, GvmError> {
        match self.resolver()?.expand(spec)? {
            Expanded::Exact {
                version,
                stable_only,
            } => {
                if stable_only && !version.is_stable() {
                    return Err(ResolutionError::NoMatch {
                        spec: spec.to_string(),
                    }
                    .into());
                }
                Ok(Some(version))
            }
            Expanded::Pattern { .. } => Ok(None),
        }
    }

    /// Resolve `spec` against the cached catalog and install the result.
    ///
    /// Never fetches the index; an absent cache fails the install.
    ///
    /// # Errors
    /// Returns [`InstallError::NotInCatalog`] when no catalog is cached or an
    /// exact version is missing from it, a resolution error for other
    /// unmatched specs, or the install error of the failing step.
    pub async fn install(
        &self,
        spec: &VersionSpec,
        activate_after: bool,
    ) -> Result<InstallOutcome, GvmError> {
        if self.catalog_snapshot()?.is_none() {
            return Err(InstallError::NotInCatalog {
                version: spec.to_string(),
            }
            .into());
        }

        let version = match self.exact_version(spec)? {
            Some(version) => version,
            None => self.resolve(spec, Target::Remote)?,
        };
        self.install_version(&version, activate_after).await
    }

    /// Install an exact catalog version.
    ///
    /// # Errors
    /// Returns [`InstallError::NotInCatalog`] if the cache lacks `version`,
    /// or the install error of the failing step.
    pub async fn install_version(
        &self,
        version: &GoVersion,
        activate_after: bool,
    ) -> Result<InstallOutcome, GvmError> {
        cleanup_stale_scratch(&self.paths, STALE_SCRATCH_AGE);

        let entry = self
            .catalog_snapshot()?
            .and_then(|snapshot| snapshot.find(version).cloned())
            .ok_or_else(|| InstallError::NotInCatalog {
                version: version.to_string(),
            })?;

        Ok(Installer::new(&self.paths, self.fetcher.as_ref())
            .install(&entry, activate_after)
            .await?)
    }

    /// Resolve `spec` against installed versions and remove the result.
    ///
    /// # Errors
    /// Returns a resolution error if nothing installed matches, or
    /// [`gvm_backend::RegistryError::ActiveVersionInUse`] for the active
    /// version without `force`.
    pub fn remove(&self, spec: &VersionSpec, force: bool) -> Result<GoVersion, GvmError> {
        cleanup_stale_scratch(&self.paths, STALE_SCRATCH_AGE);

        let version = self.resolve(spec, Target::Local)?;
        self.registry.remove(&version, force)?;
        Ok(version)
    }

    /// # Errors
    /// Returns an error for invalid names or alias cycles.
    pub fn add_alias(&self, name: &str, target: &VersionSpec) -> Result<(), GvmError> {
        Ok(self.registry.add_alias(name, target)?)
    }

    /// # Errors
    /// Returns [`gvm_backend::RegistryError::NotFound`] if the alias is absent.
    pub fn remove_alias(&self, name: &str) -> Result<(), GvmError> {
        Ok(self.registry.remove_alias(name)?)
    }

    /// # Errors
    /// Returns an error if an alias file is unreadable.
    pub fn list_aliases(&self) -> Result<BTreeMap<String, VersionSpec>, GvmError> {
        Ok(self.registry.list_aliases()?)
    }

    /// Resolve `spec` against installed versions and activate the result.
    ///
    /// # Errors
    /// Returns [`gvm_backend::ActivationError::NotInstalled`] for an exact
    /// version that is not installed, or a resolution error for other
    /// unmatched specs.
    pub fn activate(
        &self,
        spec: &VersionSpec,
    ) -> Result<(GoVersion, ActivationOutcome), GvmError> {
        let version = match self.exact_version(spec)? {
            Some(version) => version,
            None => self.resolve(spec, Target::Local)?,
        };
        let outcome = self.registry.activator().activate(&version)?;
        Ok((version, outcome))
    }

    /// # Errors
    /// Returns an error if the registry cannot be read.
    pub fn current(&self) -> Result<Option<InstalledVersion>, GvmError> {
        Ok(self.registry.get_active()?)
    }
}

mod error;
mod traits;
mod types;

pub use error::{
    ActivationError, CatalogError, ErrorFamily, GvmError, InstallError, InstallStage,
    NetworkStage, RegistryError, ResolutionError,
};
pub use traits::{ArchiveFetcher, ReleaseSource};
pub use types::{
    CatalogEntry, GoVersion, InstalledVersion, PatternSegment, STABLE_PREFIX, VersionComponent,
    VersionParseError, VersionPattern, VersionSpec, Versioned, validate_alias_name,
};

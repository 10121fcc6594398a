//! Toolchain management for gvm.
//!
//! - Remote catalog cache and the go.dev release source.
//! - Local registry of installed versions, aliases and the active pointer.
//! - Spec resolution against either universe.
//! - Transactional installs and activation.
//!
//! [`Manager`] ties these together behind one command interface.

mod activator;
mod catalog;
mod fs;
mod http;
mod installer;
mod manager;
mod registry;
mod resolver;

pub use activator::{ActivationOutcome, Activator, environment_content};
pub use catalog::{Catalog, CatalogSnapshot};
pub use http::{
    DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_RELEASE_INDEX_URL, GoDevReleaseSource, HttpArchiveFetcher,
    HttpOptions, entries_from_index,
};
pub use installer::{
    InstallOutcome, Installer, STALE_SCRATCH_AGE, cleanup_stale_scratch, verify_archive,
};
pub use manager::{Manager, RemoteListing, Target};
pub use registry::Registry;
pub use resolver::{Expanded, MAX_ALIAS_DEPTH, Resolver};

#![allow(clippy::missing_errors_doc)]

mod config;
mod detect;
mod script;

use std::path::PathBuf;

use gvm_platform::GvmPaths;
use thiserror::Error;

pub use config::{ShellConfig, ShellConfigEdit};
pub use detect::ShellType;
pub use script::{END_MARKER, START_MARKER, init_script, profile_block};

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("SHELL is not set")]
    ShellUnset,

    #[error("Unsupported shell: {shell} (bash and zsh are supported)")]
    UnsupportedShell { shell: String },

    #[error("Could not determine home directory")]
    HomeDirUnavailable,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Write `<root>/init-shell` and return its path.
pub fn write_init_script(paths: &GvmPaths) -> Result<PathBuf, ShellError> {
    let path = paths.init_script();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, init_script(paths))?;
    Ok(path)
}

/// Write the init script and hook it into the profile at `profile`.
///
/// Returns the applied edit, which has no changes when the profile was
/// already initialized.
pub fn initialize(
    paths: &GvmPaths,
    shell_type: ShellType,
    profile: PathBuf,
) -> Result<ShellConfigEdit, ShellError> {
    write_init_script(paths)?;

    let mut config = ShellConfig::load(shell_type, profile)?;
    let edit = config.add_init(&profile_block(paths));
    config.apply_edit(&edit)?;
    Ok(edit)
}

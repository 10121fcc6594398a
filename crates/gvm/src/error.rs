use gvm_backend::{ErrorFamily, GvmError, VersionParseError};
use gvm_platform::PathsError;
use gvm_shell::ShellError;
use thiserror::Error;

/// Everything a command can fail with, mapped onto the process exit code.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Gvm(#[from] GvmError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VersionParseError> for CliError {
    fn from(err: VersionParseError) -> Self {
        Self::Gvm(err.into())
    }
}

pub const EXIT_INTERNAL: u8 = 1;
pub const EXIT_RESOLUTION: u8 = 3;
pub const EXIT_NETWORK: u8 = 4;
pub const EXIT_FILESYSTEM: u8 = 5;
pub const EXIT_STATE: u8 = 6;

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Gvm(err) => match err.family() {
                ErrorFamily::Resolution => EXIT_RESOLUTION,
                ErrorFamily::Network => EXIT_NETWORK,
                ErrorFamily::Filesystem => EXIT_FILESYSTEM,
                ErrorFamily::State => EXIT_STATE,
            },
            Self::Shell(ShellError::ShellUnset | ShellError::UnsupportedShell { .. }) => {
                EXIT_STATE
            }
            Self::Shell(ShellError::HomeDirUnavailable | ShellError::IoError(_))
            | Self::Paths(PathsError::HomeDirUnavailable)
            | Self::Io(_) => EXIT_FILESYSTEM,
        }
    }
}

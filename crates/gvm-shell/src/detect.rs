use std::fmt;
use std::path::{Path, PathBuf};

use crate::ShellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellType {
    Bash,
    Zsh,
}

impl ShellType {
    /// Identify the shell from a path such as `/usr/bin/zsh`.
    #[must_use]
    pub fn from_shell_path(shell: &str) -> Option<Self> {
        let name = Path::new(shell.trim())
            .file_name()
            .and_then(|name| name.to_str())?;
        match name {
            "bash" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            _ => None,
        }
    }

    /// Detect the login shell from `$SHELL`.
    pub fn detect() -> Result<Self, ShellError> {
        let shell = std::env::var("SHELL").map_err(|_| ShellError::ShellUnset)?;
        Self::from_shell_path(&shell).ok_or(ShellError::UnsupportedShell { shell })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
        }
    }

    #[must_use]
    pub fn profile_file_name(&self) -> &'static str {
        match self {
            Self::Bash => ".bashrc",
            Self::Zsh => ".zshrc",
        }
    }

    #[must_use]
    pub fn profile_path(&self, home: &Path) -> PathBuf {
        home.join(self.profile_file_name())
    }

    pub fn default_profile_path(&self) -> Result<PathBuf, ShellError> {
        let home = dirs::home_dir().ok_or(ShellError::HomeDirUnavailable)?;
        Ok(self.profile_path(&home))
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use thiserror::Error;

use crate::types::VersionParseError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Version not found: {spec}")]
    NotFound { spec: String },

    #[error("No version matches {spec}")]
    NoMatch { spec: String },

    #[error("Alias cycle detected: {}", chain.join(" -> "))]
    AliasCycle { chain: Vec<String> },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response parse")]
    ResponseParse,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Release catalog unavailable ({stage}): {details}")]
    Unavailable { stage: NetworkStage, details: String },

    #[error("Catalog cache is corrupt: {details}")]
    CorruptCache { details: String },

    #[error("IO error ({kind}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl CatalogError {
    pub fn request(details: impl Into<String>) -> Self {
        Self::Unavailable {
            stage: NetworkStage::Request,
            details: details.into(),
        }
    }

    pub fn request_from<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::request(error.to_string())
    }

    pub fn parse(details: impl Into<String>) -> Self {
        Self::Unavailable {
            stage: NetworkStage::ResponseParse,
            details: details.into(),
        }
    }

    pub fn parse_from<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::parse(error.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    #[error("prepare")]
    Prepare,
    #[error("download")]
    Download,
    #[error("verify")]
    Verify,
    #[error("extract")]
    Extract,
    #[error("publish")]
    Publish,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    #[error("Version {version} is not in the release catalog")]
    NotInCatalog { version: String },

    #[error("Download of {url} failed: {details}")]
    DownloadFailed { url: String, details: String },

    #[error("Integrity check failed for {filename}: {details}")]
    IntegrityError { filename: String, details: String },

    #[error("Filesystem error during {stage} ({kind}): {message}")]
    FilesystemError {
        stage: InstallStage,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

impl InstallError {
    pub fn download(url: impl Into<String>, details: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            details: details.into(),
        }
    }

    pub fn integrity(filename: impl Into<String>, details: impl Into<String>) -> Self {
        Self::IntegrityError {
            filename: filename.into(),
            details: details.into(),
        }
    }

    pub fn filesystem(stage: InstallStage, err: &std::io::Error) -> Self {
        Self::FilesystemError {
            stage,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("Version {version} is not installed")]
    NotInstalled { version: String },

    #[error("Failed to {operation} ({kind}): {message}")]
    Filesystem {
        operation: &'static str,
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl ActivationError {
    pub fn filesystem(operation: &'static str, err: &std::io::Error) -> Self {
        Self::Filesystem {
            operation,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Version {version} is active; deactivate it or pass --force")]
    ActiveVersionInUse { version: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Parse(#[from] VersionParseError),

    #[error("Alias {name} is unreadable: {details}")]
    CorruptAlias { name: String, details: String },

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("IO error ({kind}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Failure class used to pick a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFamily {
    Resolution,
    Network,
    Filesystem,
    State,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GvmError {
    #[error(transparent)]
    Parse(#[from] VersionParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl GvmError {
    #[must_use]
    pub fn family(&self) -> ErrorFamily {
        match self {
            Self::Parse(_) | Self::Resolution(_) => ErrorFamily::Resolution,
            Self::Catalog(err) => catalog_family(err),
            Self::Install(err) => install_family(err),
            Self::Activation(err) => activation_family(err),
            Self::Registry(err) => registry_family(err),
        }
    }
}

fn catalog_family(err: &CatalogError) -> ErrorFamily {
    match err {
        CatalogError::Unavailable { .. } => ErrorFamily::Network,
        CatalogError::CorruptCache { .. } | CatalogError::Io { .. } => ErrorFamily::Filesystem,
    }
}

fn install_family(err: &InstallError) -> ErrorFamily {
    match err {
        InstallError::NotInCatalog { .. } => ErrorFamily::State,
        InstallError::DownloadFailed { .. } | InstallError::IntegrityError { .. } => {
            ErrorFamily::Network
        }
        InstallError::FilesystemError { .. } => ErrorFamily::Filesystem,
        InstallError::Activation(inner) => activation_family(inner),
    }
}

fn activation_family(err: &ActivationError) -> ErrorFamily {
    match err {
        ActivationError::NotInstalled { .. } => ErrorFamily::State,
        ActivationError::Filesystem { .. } => ErrorFamily::Filesystem,
    }
}

fn registry_family(err: &RegistryError) -> ErrorFamily {
    match err {
        RegistryError::ActiveVersionInUse { .. } | RegistryError::NotFound { .. } => {
            ErrorFamily::State
        }
        RegistryError::Resolution(_) | RegistryError::Parse(_) => ErrorFamily::Resolution,
        RegistryError::CorruptAlias { .. } | RegistryError::Io { .. } => ErrorFamily::Filesystem,
        RegistryError::Activation(inner) => activation_family(inner),
    }
}

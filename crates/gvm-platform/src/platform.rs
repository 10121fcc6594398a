use std::fmt;

/// Host operating system and architecture, spelled the way the upstream
/// release index spells them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    #[must_use]
    pub fn current() -> Self {
        Self::new(
            upstream_os(std::env::consts::OS),
            upstream_arch(std::env::consts::ARCH),
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

fn upstream_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn upstream_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "armv6l",
        other => other,
    }
}

use std::fmt::Write as _;
use std::path::Path;

use gvm_backend::{ActivationError, GoVersion};
use gvm_platform::GvmPaths;
use log::{debug, info, warn};

use crate::fs::{remove_file_if_exists, replace_symlink, write_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    AlreadyActive,
}

/// Sole writer of the active pointer and the shell-facing links derived
/// from it.
#[derive(Debug, Clone)]
pub struct Activator {
    paths: GvmPaths,
}

impl Activator {
    #[must_use]
    pub fn new(paths: GvmPaths) -> Self {
        Self { paths }
    }

    /// Version named by the `current` marker, if any.
    ///
    /// An unreadable marker is logged and treated as "none".
    ///
    /// # Errors
    /// Returns an error if the marker exists but cannot be read.
    pub fn current_version(&self) -> Result<Option<GoVersion>, ActivationError> {
        let content = match std::fs::read_to_string(self.paths.current_file()) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(ActivationError::filesystem("read active pointer", &error)),
        };

        match content.trim().parse::<GoVersion>() {
            Ok(version) => Ok(Some(version)),
            Err(error) => {
                warn!("Ignoring unreadable active pointer: {error}");
                Ok(None)
            }
        }
    }

    /// Make `version` the active toolchain.
    ///
    /// The pointer is written last; if any earlier step fails the previous
    /// pointer stays in place.
    ///
    /// # Errors
    /// Returns [`ActivationError::NotInstalled`] if the version directory is
    /// missing, or a filesystem error from one of the activation steps.
    pub fn activate(&self, version: &GoVersion) -> Result<ActivationOutcome, ActivationError> {
        let name = version.to_string();
        let install_dir = self.paths.version_dir(&name);
        if !install_dir.is_dir() {
            return Err(ActivationError::NotInstalled { version: name });
        }

        if self.is_consistent(version)? {
            debug!("{name} is already active");
            return Ok(ActivationOutcome::AlreadyActive);
        }

        let package_bin = self.paths.package_dir(&name).join("bin");
        std::fs::create_dir_all(&package_bin)
            .map_err(|error| ActivationError::filesystem("create package directory", &error))?;
        std::fs::create_dir_all(self.paths.build_cache_dir(&name))
            .map_err(|error| ActivationError::filesystem("create build cache directory", &error))?;
        std::fs::create_dir_all(self.paths.environment_dir())
            .map_err(|error| ActivationError::filesystem("create environment directory", &error))?;

        write_atomic(
            &self.paths.environment_file(),
            environment_content(&self.paths, version).as_bytes(),
        )
        .map_err(|error| ActivationError::filesystem("write environment file", &error))?;

        replace_symlink(&install_dir, &self.paths.current_link())
            .map_err(|error| ActivationError::filesystem("switch toolchain link", &error))?;

        write_atomic(&self.paths.current_file(), format!("{name}\n").as_bytes())
            .map_err(|error| ActivationError::filesystem("write active pointer", &error))?;

        info!("Activated Go {name}");
        Ok(ActivationOutcome::Activated)
    }

    /// Clear the active pointer, the toolchain link and the environment file.
    ///
    /// # Errors
    /// Returns a filesystem error if any of them cannot be removed.
    pub fn deactivate(&self) -> Result<(), ActivationError> {
        remove_file_if_exists(&self.paths.current_file())
            .map_err(|error| ActivationError::filesystem("remove active pointer", &error))?;
        remove_file_if_exists(&self.paths.current_link())
            .map_err(|error| ActivationError::filesystem("remove toolchain link", &error))?;
        remove_file_if_exists(&self.paths.environment_file())
            .map_err(|error| ActivationError::filesystem("remove environment file", &error))?;

        info!("Deactivated Go toolchain");
        Ok(())
    }

    fn is_consistent(&self, version: &GoVersion) -> Result<bool, ActivationError> {
        if self.current_version()?.as_ref() != Some(version) {
            return Ok(false);
        }

        let name = version.to_string();
        let link_ok = std::fs::read_link(self.paths.current_link())
            .is_ok_and(|target| target == self.paths.version_dir(&name));
        let env_ok = std::fs::read_to_string(self.paths.environment_file())
            .is_ok_and(|content| content == environment_content(&self.paths, version));

        Ok(link_ok && env_ok && self.paths.package_dir(&name).join("bin").is_dir())
    }
}

/// Shell snippet exporting the toolchain environment for `version`.
#[must_use]
pub fn environment_content(paths: &GvmPaths, version: &GoVersion) -> String {
    let name = version.to_string();
    let mut content = String::new();
    for (key, value) in [
        ("GVM_GO_VERSION", name.clone()),
        ("GOROOT", display(&paths.version_dir(&name))),
        ("GOPATH", display(&paths.package_dir(&name))),
        ("GOCACHE", display(&paths.build_cache_dir(&name))),
    ] {
        let _ = writeln!(content, "export {key}=\"{value}\"");
    }
    content
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, GvmPaths) {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = GvmPaths::new(temp.path().join("root"));
        paths.ensure_dirs().expect("layout should be created");
        (temp, paths)
    }

    fn install_stub(paths: &GvmPaths, version: &str) -> GoVersion {
        std::fs::create_dir_all(paths.version_dir(version).join("bin"))
            .expect("stub install should be created");
        version.parse().expect("test version should parse")
    }

    #[test]
    fn activate_requires_installed_version() {
        let (_temp, paths) = setup();
        let activator = Activator::new(paths);

        let error = activator
            .activate(&GoVersion::new(1, 21, 5))
            .expect_err("missing version should fail");
        assert_eq!(
            error,
            ActivationError::NotInstalled {
                version: "1.21.5".to_string()
            }
        );
        assert_eq!(activator.current_version(), Ok(None));
    }

    #[test]
    fn activate_writes_pointer_env_and_directories() {
        let (_temp, paths) = setup();
        let version = install_stub(&paths, "1.21.5");
        let activator = Activator::new(paths.clone());

        let outcome = activator.activate(&version).expect("activation should succeed");

        assert_eq!(outcome, ActivationOutcome::Activated);
        assert_eq!(activator.current_version(), Ok(Some(version.clone())));
        assert!(paths.package_dir("1.21.5").join("bin").is_dir());
        assert!(paths.build_cache_dir("1.21.5").is_dir());

        let env = std::fs::read_to_string(paths.environment_file()).expect("env should exist");
        assert!(env.contains("export GVM_GO_VERSION=\"1.21.5\""));
        assert!(env.contains(&format!(
            "export GOROOT=\"{}\"",
            paths.version_dir("1.21.5").display()
        )));
    }

    #[cfg(unix)]
    #[test]
    fn activation_is_idempotent_and_switches_link() {
        let (_temp, paths) = setup();
        let first = install_stub(&paths, "1.21.5");
        let second = install_stub(&paths, "1.22.0");
        let activator = Activator::new(paths.clone());

        activator.activate(&first).expect("first activation should succeed");
        assert_eq!(
            activator.activate(&first),
            Ok(ActivationOutcome::AlreadyActive)
        );

        activator.activate(&second).expect("switch should succeed");
        assert_eq!(
            std::fs::read_link(paths.current_link()).expect("link should exist"),
            paths.version_dir("1.22.0")
        );
        assert_eq!(activator.current_version(), Ok(Some(second)));
    }

    #[test]
    fn activation_repairs_missing_environment_file() {
        let (_temp, paths) = setup();
        let version = install_stub(&paths, "1.21.5");
        let activator = Activator::new(paths.clone());

        activator.activate(&version).expect("activation should succeed");
        std::fs::remove_file(paths.environment_file()).expect("env file should be removed");

        assert_eq!(activator.activate(&version), Ok(ActivationOutcome::Activated));
        assert!(paths.environment_file().is_file());
    }

    #[test]
    fn deactivate_clears_state() {
        let (_temp, paths) = setup();
        let version = install_stub(&paths, "1.21.5");
        let activator = Activator::new(paths.clone());

        activator.activate(&version).expect("activation should succeed");
        activator.deactivate().expect("deactivation should succeed");
        activator.deactivate().expect("second deactivation is a no-op");

        assert_eq!(activator.current_version(), Ok(None));
        assert!(!paths.current_link().exists());
        assert!(!paths.environment_file().exists());
    }

    #[test]
    fn garbled_pointer_reads_as_none() {
        let (_temp, paths) = setup();
        std::fs::write(paths.current_file(), "not a version\n").expect("pointer should be written");

        assert_eq!(Activator::new(paths).current_version(), Ok(None));
    }
}

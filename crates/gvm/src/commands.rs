use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use gvm_backend::{GvmError, InstallError, InstalledVersion, RegistryError, VersionSpec};
use gvm_core::{ActivationOutcome, InstallOutcome, Manager, RemoteListing};
use gvm_shell::ShellType;

use crate::cli::Command;
use crate::error::CliError;
use crate::settings::Settings;

pub async fn run(
    command: Command,
    manager: &Manager,
    settings: &Settings,
) -> Result<(), CliError> {
    match command {
        Command::Update => update(manager).await,
        Command::List { filter } => list(manager, filter.as_deref()),
        Command::ListRemote { filter } => list_remote(manager, filter.as_deref()),
        Command::Install {
            version,
            use_version,
        } => install(manager, &version, use_version).await,
        Command::Use { version } => use_version(manager, &version),
        Command::Remove { version, force } => remove(manager, &version, force),
        Command::Alias { name, target } => alias(manager, name.as_deref(), target.as_deref()),
        Command::Unalias { name } => {
            manager.remove_alias(&name)?;
            println!("Removed alias {name}");
            Ok(())
        }
        Command::Current => current(manager),
        Command::Init { profile } => init(manager, settings, profile),
    }
}

fn parse_filter(filter: Option<&str>) -> Result<Option<VersionSpec>, CliError> {
    Ok(filter.map(str::parse::<VersionSpec>).transpose()?)
}

async fn update(manager: &Manager) -> Result<(), CliError> {
    let snapshot = manager.update_catalog().await?;
    println!(
        "Fetched {} releases for this platform",
        snapshot.entries.len()
    );
    if let Some(latest) = snapshot.latest_stable() {
        println!("Latest stable: {}", latest.version);
    }
    Ok(())
}

const UPDATE_HINT: &str = "Run `gvm update` to fetch the release catalog.";

fn list(manager: &Manager, filter: Option<&str>) -> Result<(), CliError> {
    let filter = parse_filter(filter)?;
    let installed = manager.list_installed(filter.as_ref())?;
    if installed.is_empty() {
        eprintln!("No versions installed. Try `gvm install stable:*`.");
        return Ok(());
    }
    print!("{}", format_installed(&installed));
    Ok(())
}

fn list_remote(manager: &Manager, filter: Option<&str>) -> Result<(), CliError> {
    let filter = parse_filter(filter)?;
    let Some(snapshot) = manager.catalog_snapshot()? else {
        eprintln!("No release catalog cached. {UPDATE_HINT}");
        return Ok(());
    };

    eprintln!("Catalog fetched {}", describe_age(snapshot.age()));
    let listings = manager.list_remote(filter.as_ref())?;
    print!("{}", format_remote(&listings));
    Ok(())
}

async fn install(manager: &Manager, version: &str, activate_after: bool) -> Result<(), CliError> {
    let spec: VersionSpec = version.parse()?;
    let outcome = manager
        .install(&spec, activate_after)
        .await
        .inspect_err(|error| {
            if matches!(error, GvmError::Install(InstallError::NotInCatalog { .. })) {
                eprintln!("{UPDATE_HINT}");
            }
        })?;
    print!("{}", format_install(&outcome));
    Ok(())
}

fn use_version(manager: &Manager, version: &str) -> Result<(), CliError> {
    let spec: VersionSpec = version.parse()?;
    let (version, outcome) = manager.activate(&spec)?;
    match outcome {
        ActivationOutcome::Activated => println!("Now using Go {version}"),
        ActivationOutcome::AlreadyActive => println!("Go {version} is already active"),
    }
    Ok(())
}

fn remove(manager: &Manager, version: &str, force: bool) -> Result<(), CliError> {
    let spec: VersionSpec = version.parse()?;
    let removed = manager.remove(&spec, force)?;
    println!("Removed Go {removed}");
    Ok(())
}

fn alias(manager: &Manager, name: Option<&str>, target: Option<&str>) -> Result<(), CliError> {
    match (name, target) {
        (None, _) => {
            print!("{}", format_aliases(&manager.list_aliases()?));
        }
        (Some(name), None) => {
            let aliases = manager.list_aliases()?;
            let target = aliases.get(name).ok_or_else(|| {
                GvmError::from(RegistryError::NotFound {
                    what: format!("alias {name}"),
                })
            })?;
            println!("{name} -> {target}");
        }
        (Some(name), Some(target)) => {
            let target: VersionSpec = target.parse()?;
            manager.add_alias(name, &target)?;
            println!("{name} -> {target}");
        }
    }
    Ok(())
}

fn current(manager: &Manager) -> Result<(), CliError> {
    match manager.current()? {
        Some(active) => println!("{}", active.version),
        None => eprintln!("No version is active. Run `gvm use <version>`."),
    }
    Ok(())
}

fn init(
    manager: &Manager,
    settings: &Settings,
    profile: Option<PathBuf>,
) -> Result<(), CliError> {
    let paths = manager.paths();
    paths.ensure_dirs()?;
    if !paths.settings_file().exists() {
        settings.save(&paths.settings_file())?;
    }

    let shell = ShellType::detect()?;
    let profile = match profile {
        Some(profile) => profile,
        None => shell.default_profile_path()?,
    };
    let edit = gvm_shell::initialize(paths, shell, profile.clone())?;

    if edit.has_changes() {
        print!("{}", edit.diff_preview());
        println!("Restart {shell} or run `. {}` to finish.", profile.display());
    } else {
        println!("{} already loads gvm", profile.display());
    }
    Ok(())
}

fn format_installed(installed: &[InstalledVersion]) -> String {
    let mut out = String::new();
    for version in installed {
        if version.is_active {
            let _ = writeln!(out, "* {}", version.version);
        } else {
            let _ = writeln!(out, "  {}", version.version);
        }
    }
    out
}

fn format_remote(listings: &[RemoteListing]) -> String {
    let mut out = String::new();
    for listing in listings {
        let _ = write!(out, "{}", listing.entry.version);
        if listing.installed {
            out.push_str(" (installed)");
        }
        out.push('\n');
    }
    out
}

fn format_aliases(aliases: &BTreeMap<String, VersionSpec>) -> String {
    let width = aliases.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (name, target) in aliases {
        let _ = writeln!(out, "{name:<width$} -> {target}");
    }
    out
}

fn format_install(outcome: &InstallOutcome) -> String {
    let version = &outcome.installed.version;
    let mut out = if outcome.already_installed {
        format!("Go {version} is already installed\n")
    } else {
        format!(
            "Installed Go {version} to {}\n",
            outcome.installed.path.display()
        )
    };
    match outcome.activation {
        Some(ActivationOutcome::Activated) => {
            let _ = writeln!(out, "Now using Go {version}");
        }
        Some(ActivationOutcome::AlreadyActive) => {
            let _ = writeln!(out, "Go {version} is already active");
        }
        None => {}
    }
    out
}

fn describe_age(age: chrono::Duration) -> String {
    if age.num_days() > 0 {
        format!("{} days ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

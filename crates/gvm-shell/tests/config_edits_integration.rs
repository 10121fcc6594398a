use gvm_platform::GvmPaths;
use gvm_shell::{END_MARKER, START_MARKER, ShellConfig, ShellType, initialize};
use tempfile::tempdir;

#[test]
fn initialize_writes_script_and_profile_block_once() {
    let temp_dir = tempdir().expect("create temp dir");
    let paths = GvmPaths::new(temp_dir.path().join(".gvm"));
    let profile = temp_dir.path().join(".bashrc");
    std::fs::write(&profile, "export PATH=$PATH:/usr/local/bin\n").expect("write profile");

    let first = initialize(&paths, ShellType::Bash, profile.clone()).expect("first init");
    assert!(first.has_changes());

    let second = initialize(&paths, ShellType::Bash, profile.clone()).expect("second init");
    assert!(!second.has_changes());

    let content = std::fs::read_to_string(&profile).expect("read profile");
    assert!(content.starts_with("export PATH=$PATH:/usr/local/bin\n"));
    assert_eq!(content.matches(START_MARKER).count(), 1);
    assert_eq!(content.matches(END_MARKER).count(), 1);

    let script = std::fs::read_to_string(paths.init_script()).expect("read init script");
    assert!(script.contains("environment/go.env"));
}

#[test]
fn initialize_creates_missing_profile() {
    let temp_dir = tempdir().expect("create temp dir");
    let paths = GvmPaths::new(temp_dir.path().join(".gvm"));
    let profile = temp_dir.path().join("home").join(".zshrc");

    initialize(&paths, ShellType::Zsh, profile.clone()).expect("init");

    let config = ShellConfig::load(ShellType::Zsh, profile).expect("reload profile");
    assert!(config.has_init());
}

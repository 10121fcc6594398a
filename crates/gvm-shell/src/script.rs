use gvm_platform::GvmPaths;

pub const START_MARKER: &str = "# >>> gvm initialize >>>";
pub const END_MARKER: &str = "# <<< gvm initialize <<<";

/// Content of `<root>/init-shell`: exports the root, loads the active
/// toolchain environment and puts its binaries on `PATH`.
#[must_use]
pub fn init_script(paths: &GvmPaths) -> String {
    format!(
        r#"# Generated by gvm. Regenerate with `gvm init`.
export GVM_ROOT="{root}"

if [ -s "$GVM_ROOT/environment/go.env" ]; then
    set -a
    . "$GVM_ROOT/environment/go.env"
    set +a
fi

for gvm_bin in "$GVM_ROOT/go/bin" "$GOPATH/bin"; do
    if [ -d "$gvm_bin" ]; then
        case ":$PATH:" in
            *":$gvm_bin:"*) ;;
            *) export PATH="$gvm_bin:$PATH" ;;
        esac
    fi
done
unset gvm_bin
"#,
        root = paths.root().display()
    )
}

/// Marker-delimited profile block that sources the init script.
#[must_use]
pub fn profile_block(paths: &GvmPaths) -> String {
    let script = paths.init_script();
    format!(
        "{START_MARKER}\nif [ -s \"{path}\" ]; then\n    . \"{path}\"\nfi\n{END_MARKER}\n",
        path = script.display()
    )
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "gvm",
    about = "Install, switch between and manage Go toolchains",
    version
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    /// Use this directory instead of $GVM_DIR or ~/.gvm
    #[clap(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Also write debug logs to stderr
    #[clap(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refresh the cached release catalog from upstream
    Update,

    /// Show installed versions
    #[clap(alias = "ls")]
    List {
        /// Version, pattern (1.21.*), alias or stable:<spec>
        filter: Option<String>,
    },

    /// Show versions available in the cached catalog
    #[clap(alias = "ls-remote")]
    ListRemote {
        /// Version, pattern (1.21.*), alias or stable:<spec>
        filter: Option<String>,
    },

    /// Download and install a version
    Install {
        version: String,

        /// Activate the version once installed
        #[clap(long = "use")]
        use_version: bool,
    },

    /// Switch the active version
    Use { version: String },

    /// Remove an installed version
    #[clap(alias = "uninstall")]
    Remove {
        version: String,

        /// Allow removing the active version
        #[clap(long)]
        force: bool,
    },

    /// Create an alias, or list aliases when no arguments are given
    Alias {
        name: Option<String>,
        target: Option<String>,
    },

    /// Delete an alias
    #[clap(alias = "remove-alias")]
    Unalias { name: String },

    /// Print the active version
    Current,

    /// Set up the root directory and hook gvm into the shell profile
    Init {
        /// Profile file to edit instead of ~/.bashrc or ~/.zshrc
        #[clap(long, value_name = "FILE")]
        profile: Option<PathBuf>,
    },
}

// src/cli.rs
//! CLI definitions for the Anvil package manager
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "anvil")]
#[command(version)]
#[command(about = "Source and binary package manager with flag-aware dependency resolution", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the Anvil install database
    Init {
        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,
    },

    /// Resolve packages and show what would be forged and installed
    Resolve {
        /// Package names to resolve
        #[arg(required = true)]
        packages: Vec<String>,

        /// Repository directory holding templates and artifacts
        #[arg(short, long, default_value = "/var/lib/anvil/repo")]
        repo: String,

        /// Path to the database file
        #[arg(long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,

        /// Installation root directory
        #[arg(long, default_value = "/")]
        dest_dir: String,

        /// Resolve as a forge request for the named packages
        #[arg(long)]
        forge: bool,

        /// Resolve even if already installed
        #[arg(long)]
        reinstall: bool,

        /// Skip build-dependency recursion
        #[arg(long)]
        no_build_deps: bool,

        /// Require a flag enabled on the requested packages (repeatable)
        #[arg(long = "with", value_name = "FLAG")]
        with_flags: Vec<String>,

        /// Require a flag disabled on the requested packages (repeatable)
        #[arg(long = "without", value_name = "FLAG")]
        without_flags: Vec<String>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install packages from prebuilt artifacts
    Install {
        /// Package names to install
        #[arg(required = true)]
        packages: Vec<String>,

        /// Repository directory holding templates and artifacts
        #[arg(short, long, default_value = "/var/lib/anvil/repo")]
        repo: String,

        /// Path to the database file
        #[arg(long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,

        /// Installation root directory
        #[arg(long, default_value = "/")]
        dest_dir: String,

        /// Install even if already installed
        #[arg(long)]
        reinstall: bool,

        /// Require a flag enabled on the requested packages (repeatable)
        #[arg(long = "with", value_name = "FLAG")]
        with_flags: Vec<String>,

        /// Require a flag disabled on the requested packages (repeatable)
        #[arg(long = "without", value_name = "FLAG")]
        without_flags: Vec<String>,

        /// Show the plan without recording anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Plan source builds for packages
    Forge {
        /// Package names to forge
        #[arg(required = true)]
        packages: Vec<String>,

        /// Repository directory holding templates and artifacts
        #[arg(short, long, default_value = "/var/lib/anvil/repo")]
        repo: String,

        /// Path to the database file
        #[arg(long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,

        /// Installation root directory
        #[arg(long, default_value = "/")]
        dest_dir: String,

        /// Skip build-dependency recursion
        #[arg(long)]
        no_build_deps: bool,

        /// Require a flag enabled on the requested packages (repeatable)
        #[arg(long = "with", value_name = "FLAG")]
        with_flags: Vec<String>,

        /// Require a flag disabled on the requested packages (repeatable)
        #[arg(long = "without", value_name = "FLAG")]
        without_flags: Vec<String>,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage per-package flag overrides
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Force a flag on or off for a package (e.g. "+ssl" or "-acl")
    Set {
        /// Package name
        package: String,
        /// Signed flag, like "+ssl" or "-acl"
        flag: String,
        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,
    },

    /// Remove an override, or all overrides for a package
    Unset {
        /// Package name
        package: String,
        /// Flag name without a sign; omit to clear every override
        flag: Option<String>,
        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,
    },

    /// List flag overrides
    List {
        /// Limit to one package
        package: Option<String>,
        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/anvil/anvil.db")]
        db_path: String,
    },
}

// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: database path
fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .default_value("/var/lib/anvil/anvil.db")
        .help("Database path")
}

/// Common argument: repository directory
fn repo_arg() -> Arg {
    Arg::new("repo")
        .short('r')
        .long("repo")
        .default_value("/var/lib/anvil/repo")
        .help("Repository directory holding templates and artifacts")
}

/// Common argument: installation root
fn dest_dir_arg() -> Arg {
    Arg::new("dest_dir")
        .long("dest-dir")
        .default_value("/")
        .help("Installation root directory")
}

/// Common argument: require a flag enabled on the requested packages
fn with_arg() -> Arg {
    Arg::new("with_flags")
        .long("with")
        .value_name("FLAG")
        .action(clap::ArgAction::Append)
        .help("Require a flag enabled on the requested packages")
}

/// Common argument: require a flag disabled on the requested packages
fn without_arg() -> Arg {
    Arg::new("without_flags")
        .long("without")
        .value_name("FLAG")
        .action(clap::ArgAction::Append)
        .help("Require a flag disabled on the requested packages")
}

fn build_cli() -> Command {
    Command::new("anvil")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Anvil Contributors")
        .about("Source and binary package manager with flag-aware dependency resolution")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Initialize the Anvil install database")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve packages and show what would be forged and installed")
                .arg(Arg::new("packages").required(true).num_args(1..).help("Package names"))
                .arg(repo_arg())
                .arg(db_path_arg())
                .arg(dest_dir_arg())
                .arg(
                    Arg::new("forge")
                        .long("forge")
                        .action(clap::ArgAction::SetTrue)
                        .help("Resolve as a forge request"),
                )
                .arg(
                    Arg::new("reinstall")
                        .long("reinstall")
                        .action(clap::ArgAction::SetTrue)
                        .help("Resolve even if already installed"),
                )
                .arg(
                    Arg::new("no_build_deps")
                        .long("no-build-deps")
                        .action(clap::ArgAction::SetTrue)
                        .help("Skip build-dependency recursion"),
                )
                .arg(with_arg())
                .arg(without_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Emit the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("install")
                .about("Install packages from prebuilt artifacts")
                .arg(Arg::new("packages").required(true).num_args(1..).help("Package names"))
                .arg(repo_arg())
                .arg(db_path_arg())
                .arg(dest_dir_arg())
                .arg(
                    Arg::new("reinstall")
                        .long("reinstall")
                        .action(clap::ArgAction::SetTrue)
                        .help("Install even if already installed"),
                )
                .arg(with_arg())
                .arg(without_arg())
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(clap::ArgAction::SetTrue)
                        .help("Show the plan without recording anything"),
                ),
        )
        .subcommand(
            Command::new("forge")
                .about("Plan source builds for packages")
                .arg(Arg::new("packages").required(true).num_args(1..).help("Package names"))
                .arg(repo_arg())
                .arg(db_path_arg())
                .arg(dest_dir_arg())
                .arg(
                    Arg::new("no_build_deps")
                        .long("no-build-deps")
                        .action(clap::ArgAction::SetTrue)
                        .help("Skip build-dependency recursion"),
                )
                .arg(with_arg())
                .arg(without_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Emit the plan as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage per-package flag overrides")
                .subcommand(
                    Command::new("set")
                        .about("Force a flag on or off for a package")
                        .arg(Arg::new("package").required(true).help("Package name"))
                        .arg(Arg::new("flag").required(true).help("Signed flag, like \"+ssl\""))
                        .arg(db_path_arg()),
                )
                .subcommand(
                    Command::new("unset")
                        .about("Remove an override, or all overrides for a package")
                        .arg(Arg::new("package").required(true).help("Package name"))
                        .arg(Arg::new("flag").help("Flag name without a sign"))
                        .arg(db_path_arg()),
                )
                .subcommand(
                    Command::new("list")
                        .about("List flag overrides")
                        .arg(Arg::new("package").help("Limit to one package"))
                        .arg(db_path_arg()),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("anvil.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}

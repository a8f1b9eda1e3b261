// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigAction};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { db_path }) => commands::cmd_init(&db_path),
        Some(Commands::Resolve {
            packages,
            repo,
            db_path,
            dest_dir,
            forge,
            reinstall,
            no_build_deps,
            with_flags,
            without_flags,
            json,
        }) => commands::cmd_resolve(
            &packages,
            &repo,
            &db_path,
            &dest_dir,
            forge,
            reinstall,
            no_build_deps,
            &with_flags,
            &without_flags,
            json,
        ),
        Some(Commands::Install {
            packages,
            repo,
            db_path,
            dest_dir,
            reinstall,
            with_flags,
            without_flags,
            dry_run,
        }) => commands::cmd_install(
            &packages,
            &repo,
            &db_path,
            &dest_dir,
            reinstall,
            &with_flags,
            &without_flags,
            dry_run,
        ),
        Some(Commands::Forge {
            packages,
            repo,
            db_path,
            dest_dir,
            no_build_deps,
            with_flags,
            without_flags,
            json,
        }) => commands::cmd_forge(
            &packages,
            &repo,
            &db_path,
            &dest_dir,
            no_build_deps,
            &with_flags,
            &without_flags,
            json,
        ),
        Some(Commands::Config { action }) => match action {
            ConfigAction::Set {
                package,
                flag,
                db_path,
            } => commands::cmd_config_set(&package, &flag, &db_path),
            ConfigAction::Unset {
                package,
                flag,
                db_path,
            } => commands::cmd_config_unset(&package, flag.as_deref(), &db_path),
            ConfigAction::List { package, db_path } => {
                commands::cmd_config_list(package.as_deref(), &db_path)
            }
        },
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

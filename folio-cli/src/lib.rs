//! Folio CLI library.
//!
//! Types and command handlers behind the `folio` binary: catalog
//! validation, access-check query generation and what-if access checks.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

use cli::{Cli, Commands};

/// Dispatch a parsed [`Cli`] to the appropriate command handler.
pub async fn run(cli: Cli) -> error::CliResult<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Validate => {
            let catalog_path = config::require_catalog_path(config_path)?;
            commands::validate::run(&catalog_path, cli.quiet)
        }

        Commands::Query { pi, file } => commands::query::run(&pi, &file),

        Commands::Check {
            privilege,
            conditions,
            pi,
            user,
            groups,
            superuser,
            ip,
            client,
            client_status,
            condition_match,
            json,
        } => {
            let catalog_path = config::require_catalog_path(config_path)?;
            let opts = commands::check::CheckOpts {
                privilege,
                conditions,
                pi,
                user,
                groups,
                superuser,
                ip,
                client,
                client_status,
                condition_match,
                json,
            };
            commands::check::run(&catalog_path, opts).await
        }
    }
}

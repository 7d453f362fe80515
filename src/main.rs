#![warn(unused_extern_crates)]

mod cmd;
mod commands;

use clap::Parser;
use cluster_auth::utils::resolve_config_dir;
use cmd::{Cli, Commands};
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn error_to_string(error: impl Error) -> String {
    error.to_string()
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let config_dir = resolve_config_dir(cli.config_dir.as_deref());

    match cli.command {
        Commands::Import { path, select } => {
            commands::kubeconfig::exec_import(&config_dir, &path, select).map_err(error_to_string)
        }
        Commands::List { formatting } => {
            commands::clusters::exec_list(&config_dir, formatting).map_err(error_to_string)
        }
        Commands::Use { id } => {
            commands::clusters::exec_use(&config_dir, &id).map_err(error_to_string)
        }
        Commands::Namespace { namespace } => {
            commands::clusters::exec_namespace(&config_dir, &namespace).map_err(error_to_string)
        }
        Commands::Delete { id } => {
            commands::clusters::exec_delete(&config_dir, &id).map_err(error_to_string)
        }
        Commands::Credentials { id } => commands::credentials::exec_credentials(&config_dir, id)
            .await
            .map_err(error_to_string),
        Commands::Export { ids } => {
            commands::kubeconfig::exec_export(&config_dir, &ids).map_err(error_to_string)
        }
    }
}

// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongbox - encrypted credential store.
//!
//! This is the binary entry point. Every subcommand prints a JSON document on
//! stdout; logs go to stderr.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod services;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use strongbox_core::StrongboxError;

use crate::services::Services;

/// Strongbox - encrypted credential store.
#[derive(Parser, Debug)]
#[command(name = "strongbox", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-encrypt every stored version under the active key.
    Rotate,
    /// Show how many versions each configured key protects.
    KeyUsage,
    /// Print the latest version of a credential.
    Get {
        name: String,
        /// Fetch this version id instead of the latest.
        #[arg(long)]
        version: Option<Uuid>,
    },
    /// Store a caller-provided value.
    Set {
        name: String,
        value: String,
        #[arg(long = "type", default_value = "value")]
        credential_type: String,
    },
    /// Generate the first version of a credential.
    Generate {
        name: String,
        #[arg(long = "type")]
        credential_type: String,
        /// Generation parameters as a JSON object.
        #[arg(long)]
        parameters: Option<String>,
    },
    /// Regenerate one credential from its stored parameters.
    Regenerate { name: String },
    /// Regenerate a CA and every certificate it signed.
    BulkRegenerate { signer: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => strongbox_config::load_and_validate_path(path),
        None => strongbox_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            strongbox_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, backend = ?config.backend.kind, "config loaded");

    if let Err(e) = run(cli.command, &config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(
    command: Commands,
    config: &strongbox_config::StrongboxConfig,
) -> Result<(), StrongboxError> {
    let services = Services::build(config).await?;
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = match command {
        Commands::Rotate => commands::rotate(&services, &cancel).await,
        Commands::KeyUsage => commands::key_usage(&services).await,
        Commands::Get { name, version } => commands::get(&services, &name, version).await,
        Commands::Set {
            name,
            value,
            credential_type,
        } => commands::set(&services, &name, &credential_type, &value).await,
        Commands::Generate {
            name,
            credential_type,
            parameters,
        } => commands::generate(&services, &name, &credential_type, parameters.as_deref()).await,
        Commands::Regenerate { name } => commands::regenerate(&services, &name).await,
        Commands::BulkRegenerate { signer } => {
            commands::bulk_regenerate(&services, &signer, &cancel).await
        }
    };

    ctrl_c.abort();
    services.shutdown().await?;

    let output = result?;
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| StrongboxError::Internal(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupt received, stopping after the current step");
        cancel.cancel();
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strongbox={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

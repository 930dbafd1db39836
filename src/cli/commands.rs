use crate::config::ValidationConfig;
use crate::demo::build_router;
use crate::pipeline::{Pipeline, Response};
use crate::server::{AppService, HttpServer};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for the brrtvalidate demo server
#[derive(Parser)]
#[command(name = "brrtvalidate")]
#[command(about = "Schema-validated demo HTTP service", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo routes
    Serve {
        /// Address and port to bind the server to
        #[arg(long, env = "BRRTV_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,

        /// YAML configuration file with a `validation` section
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the demo route table
    Routes,
}

/// Validation configuration from `path`, or from the environment when no file is given.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::from_yaml_file(path),
        None => Ok(ValidationConfig::from_env()),
    }
}

/// Assemble the demo service for `config`.
///
/// With `raise_on_error` set, raised validation errors are presented by a
/// handler that keeps the configured status and adds a title.
///
/// # Errors
///
/// Fails when a demo route cannot be registered.
pub fn build_service(config: ValidationConfig) -> Result<AppService> {
    let router = build_router()?;
    let mut service = AppService::new(router, Pipeline::new(config));
    if config.raise_on_error {
        let status = config.error_status_code;
        service.register_error_handler(move |err| {
            Response::json(
                status,
                json!({
                    "title": "validation error",
                    "validation_error": err.to_dict(),
                }),
            )
        });
    }
    Ok(service)
}

/// Parse the process arguments and execute the command.
///
/// # Errors
///
/// See [`run`].
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

/// Execute a parsed command.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file cannot be loaded
/// - A demo route cannot be registered
/// - The server fails to bind or its coroutine panics
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { addr, config } => {
            let config = load_config(config.as_deref())?;
            info!(
                error_status_code = config.error_status_code,
                raise_on_error = config.raise_on_error,
                "Validation configuration loaded"
            );
            let service = build_service(config)?;
            for line in service.router().describe() {
                info!(route = %line, "Route registered");
            }
            let handle = HttpServer(service)
                .start(addr.as_str())
                .with_context(|| format!("Failed to bind {addr}"))?;
            handle
                .join()
                .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))?;
            Ok(())
        }
        Commands::Routes => {
            for line in build_router()?.describe() {
                println!("{line}");
            }
            Ok(())
        }
    }
}

//! Unit tests for CLI commands

use crate::cli::{build_service, load_config, Cli, Commands};
use crate::config::ValidationConfig;
use crate::request::RawRequest;
use clap::Parser;
use http::Method;
use serde_json::json;
use std::io::Write;

#[test]
fn test_serve_command_defaults() {
    let cli = Cli::try_parse_from(["brrtvalidate", "serve"]).unwrap();
    match cli.command {
        Commands::Serve { addr, config } => {
            assert!(!addr.is_empty());
            assert!(config.is_none());
        }
        Commands::Routes => panic!("Expected Serve command"),
    }
}

#[test]
fn test_serve_command_with_flags() {
    let cli = Cli::try_parse_from([
        "brrtvalidate",
        "serve",
        "--addr",
        "127.0.0.1:9090",
        "--config",
        "config.yaml",
    ])
    .unwrap();
    match cli.command {
        Commands::Serve { addr, config } => {
            assert_eq!(addr, "127.0.0.1:9090");
            assert_eq!(config.unwrap().to_string_lossy(), "config.yaml");
        }
        Commands::Routes => panic!("Expected Serve command"),
    }
}

#[test]
fn test_routes_command() {
    let cli = Cli::try_parse_from(["brrtvalidate", "routes"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes));
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "validation:\n  error_status_code: 422").unwrap();
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.error_status_code, 422);
    assert!(!config.raise_on_error);
}

#[test]
fn test_raising_service_uses_registered_handler() {
    let config = ValidationConfig {
        error_status_code: 422,
        raise_on_error: true,
    };
    let service = build_service(config).unwrap();
    let request = RawRequest::new(Method::POST, "/silent").with_header("Content-Type", "application/json");
    let response = service.handle(&request);
    assert_eq!(response.status, 422);
    assert_eq!(response.body["title"], json!("validation error"));
    assert_eq!(
        response.body["validation_error"]["body_params"][0]["loc"],
        json!(["param"])
    );
}

//! # CLI Module
//!
//! Command-line interface of the `brrtvalidate` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve the demo routes on the coroutine HTTP server:
//!
//! ```bash
//! brrtvalidate serve --addr 127.0.0.1:8080 --config config.yaml
//! ```
//!
//! Options:
//! - `--addr <ADDR>` - address to bind (default `0.0.0.0:8080`, env `BRRTV_ADDR`)
//! - `--config <FILE>` - YAML file with a `validation:` section; without it the
//!   `BRRTV_VALIDATION_*` environment variables are used
//!
//! ### `routes`
//!
//! Print the registered demo routes and exit:
//!
//! ```bash
//! brrtvalidate routes
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use brrtvalidate::cli::{run, Cli};
//! use clap::Parser;
//!
//! run(Cli::parse())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{build_service, load_config, run, run_cli, Cli, Commands};

//! # Validation Configuration
//!
//! Process-wide knobs of the validation pipeline, handed to
//! [`Pipeline::new`](crate::pipeline::Pipeline::new) explicitly at startup.
//!
//! ## Environment Variables
//!
//! - `BRRTV_VALIDATION_ERROR_STATUS_CODE` - status of automatic validation error
//!   responses (default `400`)
//! - `BRRTV_VALIDATION_ERROR_RAISE` - propagate a [`ValidationError`](crate::error::ValidationError)
//!   instead of responding (default `false`)
//!
//! - `BRRTV_STACK_SIZE` - coroutine stack size in bytes, decimal or `0x` hex
//!   (default `0x10000`); see [`RuntimeConfig`]
//!
//! ## YAML
//!
//! ```yaml
//! validation:
//!   error_status_code: 422
//!   raise_on_error: false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

const DEFAULT_ERROR_STATUS: u16 = 400;

/// Validation behaviour shared by every route of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Status code of automatic validation error responses
    pub error_status_code: u16,
    /// Propagate validation failures as errors instead of responding
    pub raise_on_error: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            error_status_code: DEFAULT_ERROR_STATUS,
            raise_on_error: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    validation: ValidationConfig,
}

impl ValidationConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            error_status_code: env::var("BRRTV_VALIDATION_ERROR_STATUS_CODE")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|code| (100..=599).contains(code))
                .unwrap_or(defaults.error_status_code),
            raise_on_error: env::var("BRRTV_VALIDATION_ERROR_RAISE")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.raise_on_error),
        }
    }

    /// Load the `validation` section of a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yaml::from_str(text)?;
        anyhow::ensure!(
            (100..=599).contains(&file.validation.error_status_code),
            "error_status_code {} is not an HTTP status",
            file.validation.error_status_code
        );
        Ok(file.validation)
    }
}

/// Default coroutine stack: schema validation recurses through nested documents.
const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Coroutine runtime settings, applied with `may::config()` before the server starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let stack_size = env::var("BRRTV_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }

    /// Apply to the global `may` configuration.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ValidationConfig::default();
        assert_eq!(config.error_status_code, 400);
        assert!(!config.raise_on_error);
    }

    #[test]
    fn test_from_yaml_str_partial() {
        let config = ValidationConfig::from_yaml_str("validation:\n  raise_on_error: true\n").unwrap();
        assert_eq!(config.error_status_code, 400);
        assert!(config.raise_on_error);
        assert_eq!(
            ValidationConfig::from_yaml_str("").unwrap(),
            ValidationConfig::default()
        );
    }

    #[test]
    fn test_from_yaml_rejects_bad_status() {
        assert!(ValidationConfig::from_yaml_str("validation:\n  error_status_code: 42\n").is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validation:\n  error_status_code: 422").unwrap();
        let config = ValidationConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.error_status_code, 422);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size("65536"), Some(65536));
        assert_eq!(parse_size("big"), None);
        assert_eq!(RuntimeConfig::default().stack_size, 0x10000);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

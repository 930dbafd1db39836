use brrtvalidate::cli::run_cli;
use brrtvalidate::config::RuntimeConfig;
use brrtvalidate::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    init_logging_with_config(&LogConfig::from_env())?;
    RuntimeConfig::from_env().apply();
    run_cli()
}

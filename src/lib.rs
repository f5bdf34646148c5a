pub mod audio;
pub mod config;
pub mod daemon;
pub mod dirs;
pub mod models;
pub mod record;
pub mod session;
pub mod transcribe;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Application-specific environment variable for log filtering (overrides config).
const LOG_ENV_VAR: &str = "DICTADO_LOG";

/// Configure logging.
///
/// Diagnostics go to stderr: stdout belongs to the line protocol and hosts
/// read it line by line.
pub fn init_logging(config: &config::Config) -> anyhow::Result<()> {
    // DICTADO_LOG env var overrides the config file level
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(config.logging.level.as_directive().parse()?)
        .from_env()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(filter)
        .init();

    Ok(())
}

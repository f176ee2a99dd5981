//! Tracing subscriber setup: stderr always, a log file when the configured
//! directory is writable.

use std::fs::{File, OpenOptions};
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

const LOG_FILE: &str = "castor.log";

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// filter. A log path that cannot be created or opened demotes the server to
/// stderr-only logging, with one error line saying so.
pub fn init(cfg: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_target(false);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    match open_log_file(cfg) {
        Ok(file) => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Arc::new(file))
                        .with_ansi(false)
                        .with_level(true)
                        .with_target(false),
                )
                .init();
        }
        Err(e) => {
            registry.init();
            error!(
                logpath = %cfg.logpath.display(),
                error = %e,
                "cannot open log file; logging to stderr only"
            );
        }
    }
}

fn open_log_file(cfg: &LoggingConfig) -> std::io::Result<File> {
    std::fs::create_dir_all(&cfg.logpath)?;
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(cfg.logpath.join(LOG_FILE))
}

mod cli;
mod logging;
mod rate_limiter;
mod server;

pub use cli::Cli;
pub use logging::LoggingConfig;
pub use rate_limiter::RateLimiterConfig;
pub use server::ServerConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CastorError;

/// Application configuration, managed by figment.
///
/// Layering, lowest to highest: built-in defaults, command-line flags, the
/// config file named by `-c/--config` (when given, its keys win and the
/// flags only fill the gaps).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(rename = "Server", default)]
    pub server: ServerConfig,

    #[serde(rename = "RateLimiter", default)]
    pub rate_limiter: RateLimiterConfig,

    #[serde(rename = "Logging", default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Builds the figment for the given CLI arguments.
    pub fn figment(cli: &Cli) -> Result<Figment, CastorError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Serialized::defaults(cli.overlay()));
        if let Some(path) = &cli.config {
            if !Path::new(path).is_file() {
                return Err(CastorError::ImproperlyConfigured(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment)
    }

    /// Resolve the full configuration from CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self, CastorError> {
        Self::figment(cli)?
            .extract()
            .map_err(|e| CastorError::ImproperlyConfigured(e.to_string()))
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log sink configuration, the `[Logging]` table of the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory the server log is appended under. When it cannot be created
    /// or opened, logging stays on stderr only.
    #[serde(default = "default_logpath")]
    pub logpath: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logpath: default_logpath(),
        }
    }
}

fn default_logpath() -> PathBuf {
    PathBuf::from("/var/log/castor/")
}

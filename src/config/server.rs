use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Core server configuration, the `[Server]` table of the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// IP or hostname to bind. Default: `localhost`.
    #[serde(default = "default_ip")]
    pub ip: String,

    /// Listening port. Default: `1965`.
    #[serde(default = "default_port")]
    pub port: u16,

    /// PEM certificate chain presented to clients.
    #[serde(default = "default_certfile")]
    pub certfile: PathBuf,

    /// PEM private key matching the certificate.
    #[serde(default = "default_keyfile")]
    pub keyfile: PathBuf,

    /// Listen backlog. Default: `5`.
    #[serde(default = "default_nb_connections")]
    pub nb_connections: u32,

    /// Send readiness/stopping notifications to systemd.
    #[serde(default)]
    pub systemd: bool,

    /// Bind an IPv6 socket when the host resolves to one. Default: on.
    #[serde(default = "default_true")]
    pub ipv6: bool,

    /// Handle connections concurrently (and rate-limit them). When off the
    /// server runs one connection at a time with the no-op limiter.
    #[serde(default = "default_true")]
    pub threading: bool,

    /// Static directory served by the default catch-all route. The binary
    /// requires it; library consumers wire their own route tables instead.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
            certfile: default_certfile(),
            keyfile: default_keyfile(),
            nb_connections: default_nb_connections(),
            systemd: false,
            ipv6: true,
            threading: true,
            root: None,
        }
    }
}

fn default_ip() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1965
}

fn default_certfile() -> PathBuf {
    PathBuf::from("cert.pem")
}

fn default_keyfile() -> PathBuf {
    PathBuf::from("key.pem")
}

fn default_nb_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

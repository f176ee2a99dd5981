use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Command-line surface. Every value here is optional: present flags override
/// built-in defaults, and config-file keys override both.
#[derive(Parser, Debug, Default)]
#[command(name = "castor", version, about = "Castor: a Gemini protocol server")]
pub struct Cli {
    /// IP/Host of your server
    #[arg(long)]
    pub ip: Option<String>,

    /// Listening port
    #[arg(long)]
    pub port: Option<u16>,

    /// PEM certificate chain
    #[arg(long)]
    pub certfile: Option<PathBuf>,

    /// PEM private key
    #[arg(long)]
    pub keyfile: Option<PathBuf>,

    /// Maximum number of pending connections
    #[arg(long = "nb-connections")]
    pub nb_connections: Option<u32>,

    /// Notify systemd about readiness
    #[arg(long, overrides_with = "no_systemd")]
    pub systemd: bool,

    /// Do not notify systemd
    #[arg(long = "no-systemd")]
    pub no_systemd: bool,

    /// Do not bind an IPv6 socket
    #[arg(long = "disable-ipv6")]
    pub disable_ipv6: bool,

    /// Handle connections one at a time, without rate limiting
    #[arg(long = "no-threading")]
    pub no_threading: bool,

    /// Static directory served at the catch-all route
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Config file to load (its keys win over the other flags)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

/// The CLI rendered as a partial `[Server]` table for the figment merge:
/// absent options serialize to nothing and leave lower layers untouched.
#[derive(Debug, Serialize)]
pub(super) struct CliOverlay {
    #[serde(rename = "Server")]
    server: ServerOverlay,
}

#[derive(Debug, Serialize)]
struct ServerOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certfile: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyfile: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nb_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    systemd: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipv6: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<PathBuf>,
}

impl Cli {
    pub(super) fn overlay(&self) -> CliOverlay {
        let systemd = if self.systemd {
            Some(true)
        } else if self.no_systemd {
            Some(false)
        } else {
            None
        };
        CliOverlay {
            server: ServerOverlay {
                ip: self.ip.clone(),
                port: self.port,
                certfile: self.certfile.clone(),
                keyfile: self.keyfile.clone(),
                nb_connections: self.nb_connections,
                systemd,
                ipv6: self.disable_ipv6.then_some(false),
                threading: self.no_threading.then_some(false),
                root: self.root.clone(),
            },
        }
    }
}

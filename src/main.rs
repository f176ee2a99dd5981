use clap::Parser;
use mimalloc::MiMalloc;
use tracing::info;

use castor::config::{Cli, Config};
use castor::error::CastorError;
use castor::handlers::StaticHandler;
use castor::router::{RouteTarget, Router};
use castor::server::Server;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli)?;

    castor::logging::init(&cfg.logging);
    info!(
        ip = %cfg.server.ip,
        port = cfg.server.port,
        threading = cfg.server.threading,
        "configuration loaded"
    );

    // The binary serves one static tree at the catch-all route. Library
    // consumers build richer route tables and hand them to `Server::new`.
    let root = cfg.server.root.clone().ok_or_else(|| {
        CastorError::ImproperlyConfigured(
            "no static root configured; pass --root or set root under [Server]".to_string(),
        )
    })?;
    let routes = vec![(
        String::new(),
        RouteTarget::handler(StaticHandler::with_defaults(root)?),
    )];
    let router = Router::new(routes)?;

    Server::new(cfg, router).run().await?;
    info!("server has shut down gracefully");
    Ok(())
}

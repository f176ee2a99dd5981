//! Accept loop and server lifecycle.

mod worker;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::{TcpListener, TcpSocket, TcpStream, lookup_host};
use tokio::signal;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CastorError;
use crate::ratelimiter::build_limiter;
use crate::router::Router;
use crate::systemd;
use crate::tls;
use worker::WorkerContext;

/// The assembled server: configuration plus an immutable route table.
///
/// `run` binds, accepts and dispatches one worker per connection until
/// SIGINT/SIGTERM. In-flight workers are not joined on shutdown; at most
/// some in-flight access logging is lost.
pub struct Server {
    config: Config,
    router: Arc<Router>,
}

impl Server {
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    pub async fn run(self) -> Result<(), CastorError> {
        let server_cfg = &self.config.server;
        let (acceptor, identity) =
            tls::build_acceptor(&server_cfg.certfile, &server_cfg.keyfile)?;

        let limiter = build_limiter(&self.config.rate_limiter, server_cfg.threading);
        let shutdown = Arc::new(AtomicBool::new(false));
        Arc::clone(&limiter).run(Arc::clone(&shutdown));

        let listener = bind(server_cfg).await?;
        let local = listener.local_addr()?;
        info!("Gemini server listening on {local}");

        if server_cfg.systemd {
            systemd::notify_ready();
        }

        let ctx = Arc::new(WorkerContext {
            router: Arc::clone(&self.router),
            limiter,
            identity: Arc::new(identity),
            port: server_cfg.port,
        });

        let signal = shutdown_signal();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.dispatch(&ctx, &acceptor, stream, peer).await;
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                () = &mut signal => {
                    if server_cfg.systemd {
                        systemd::notify_stopping();
                    }
                    shutdown.store(true, Ordering::Relaxed);
                    info!("shutdown signal received, stopping");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        ctx: &Arc<WorkerContext>,
        acceptor: &tokio_rustls::TlsAcceptor,
        stream: TcpStream,
        peer: SocketAddr,
    ) {
        let ctx = Arc::clone(ctx);
        let acceptor = acceptor.clone();
        if self.config.server.threading {
            tokio::spawn(worker::handle(ctx, acceptor, stream, peer));
        } else {
            worker::handle(ctx, acceptor, stream, peer).await;
        }
    }
}

/// Resolve the configured address and bind with the configured backlog,
/// preferring an IPv6 address unless IPv6 is disabled.
async fn bind(cfg: &crate::config::ServerConfig) -> Result<TcpListener, CastorError> {
    let addrs: Vec<SocketAddr> = lookup_host((cfg.ip.as_str(), cfg.port)).await?.collect();
    let addr = if cfg.ipv6 {
        addrs
            .iter()
            .find(|a| a.is_ipv6())
            .or_else(|| addrs.first())
    } else {
        addrs.iter().find(|a| a.is_ipv4())
    };
    let addr = *addr.ok_or_else(|| {
        CastorError::ImproperlyConfigured(format!("cannot resolve {}:{}", cfg.ip, cfg.port))
    })?;

    let socket = if addr.is_ipv6() {
        TcpSocket::new_v6()?
    } else {
        TcpSocket::new_v4()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(socket.listen(cfg.nb_connections)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

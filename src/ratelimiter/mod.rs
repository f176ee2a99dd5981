//! Per-client rate limiting.
//!
//! Two cooperating token buckets protect the server: a connection limiter
//! (accepts per second) and a speed limiter (bytes per minute), each decayed
//! by its own refill worker. Repeat violators land in the hall of shame.

mod bucket;
mod connection;
mod hall;
mod speed;

pub use connection::ConnectionLimiter;
pub use hall::HallOfShame;
pub use speed::SpeedLimiter;

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::config::RateLimiterConfig;

/// The limiter surface the connection worker sees.
pub trait RateLimit: Send + Sync {
    /// Account a new connection. `false`: refuse with status 44.
    fn admit(&self, client: IpAddr) -> bool;

    /// Deduct `amount` transfer bytes. `false`: the client is over quota and
    /// the payload must be withheld.
    fn consume(&self, client: IpAddr, amount: u64) -> bool;

    /// Charge the connection-window penalty for a misbehaving client.
    fn penalize(&self, client: IpAddr);

    /// Whether a zero-amount probe would fail right now.
    fn in_violation(&self, client: IpAddr) -> bool;

    /// Seconds the client should back off; 0 when not in violation.
    fn penalty_secs(&self, client: IpAddr) -> u64;

    /// Start the refill workers. The flag is checked on every wake-up.
    fn run(self: Arc<Self>, shutdown: Arc<AtomicBool>);
}

/// Periodic reset behavior of a limiter, driven by [`refill_loop`].
pub(crate) trait Refill {
    fn sleeptime(&self) -> Duration;
    fn tick(&self);
}

/// Sleep for the limiter's cadence, apply its reset rule, and go back to
/// sleep until the shutdown flag is raised. Exempt from the socket timeout.
pub(crate) async fn refill_loop<L>(limiter: Arc<L>, shutdown: Arc<AtomicBool>)
where
    L: Refill + Send + Sync + 'static,
{
    loop {
        tokio::time::sleep(limiter.sleeptime()).await;
        if shutdown.load(Ordering::Relaxed) {
            debug!("refill worker stopping");
            return;
        }
        limiter.tick();
    }
}

/// Both limiters behind one interface. The hall of shame is shared between
/// them, so strikes from either side accumulate against the same client.
pub struct CompositeLimiter {
    connections: Arc<ConnectionLimiter>,
    speed: Arc<SpeedLimiter>,
}

impl CompositeLimiter {
    pub fn new(cfg: &RateLimiterConfig) -> Self {
        let hall = Arc::new(HallOfShame::new(cfg.hos_strikes_to_ban));
        Self {
            connections: Arc::new(ConnectionLimiter::new(cfg, Arc::clone(&hall))),
            speed: Arc::new(SpeedLimiter::new(cfg, hall)),
        }
    }
}

impl RateLimit for CompositeLimiter {
    fn admit(&self, client: IpAddr) -> bool {
        self.connections.admit(client)
    }

    fn consume(&self, client: IpAddr, amount: u64) -> bool {
        self.speed.take(client, amount)
    }

    fn penalize(&self, client: IpAddr) {
        self.connections.penalize(client);
    }

    fn in_violation(&self, client: IpAddr) -> bool {
        self.connections.in_violation(client) || self.speed.in_violation(client)
    }

    fn penalty_secs(&self, client: IpAddr) -> u64 {
        self.connections
            .penalty_secs(client)
            .max(self.speed.penalty_secs(client))
    }

    fn run(self: Arc<Self>, shutdown: Arc<AtomicBool>) {
        tokio::spawn(refill_loop(
            Arc::clone(&self.connections),
            Arc::clone(&shutdown),
        ));
        tokio::spawn(refill_loop(Arc::clone(&self.speed), shutdown));
    }
}

/// Stand-in when concurrency is disabled: admits everything, never refills.
pub struct NoopLimiter;

impl RateLimit for NoopLimiter {
    fn admit(&self, _client: IpAddr) -> bool {
        true
    }

    fn consume(&self, _client: IpAddr, _amount: u64) -> bool {
        true
    }

    fn penalize(&self, _client: IpAddr) {}

    fn in_violation(&self, _client: IpAddr) -> bool {
        false
    }

    fn penalty_secs(&self, _client: IpAddr) -> u64 {
        0
    }

    fn run(self: Arc<Self>, _shutdown: Arc<AtomicBool>) {}
}

/// Emit the limiter matching the server's concurrency mode.
pub fn build_limiter(cfg: &RateLimiterConfig, threading: bool) -> Arc<dyn RateLimit> {
    if threading {
        Arc::new(CompositeLimiter::new(cfg))
    } else {
        Arc::new(NoopLimiter)
    }
}

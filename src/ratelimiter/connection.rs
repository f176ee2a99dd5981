use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use super::bucket::TokenCounter;
use super::hall::HallOfShame;
use super::Refill;
use crate::config::RateLimiterConfig;

/// Counts accepted connections per client inside a sliding window; the
/// refill worker wipes the window clean every `sleeptime` seconds.
pub struct ConnectionLimiter {
    tokens: TokenCounter,
    sleeptime: Duration,
    penalty: u64,
    penalty_secs: u64,
    hall: Arc<HallOfShame>,
}

impl ConnectionLimiter {
    pub fn new(cfg: &RateLimiterConfig, hall: Arc<HallOfShame>) -> Self {
        Self {
            tokens: TokenCounter::new(cfg.connectionlimiter_connections_per_second),
            sleeptime: Duration::from_secs(cfg.connectionlimiter_sleeptime),
            penalty: cfg.connectionlimiter_penalty,
            penalty_secs: cfg.connectionlimiter_penaltytime,
            hall,
        }
    }

    /// Account one accepted connection. `false` means the client is over the
    /// per-window budget (or the lock was contended) and must be refused.
    pub fn admit(&self, client: IpAddr) -> bool {
        self.tokens.charge(client, 1)
    }

    /// Charge the configured penalty against the client's window.
    pub fn penalize(&self, client: IpAddr) {
        let _ = self.tokens.charge(client, self.penalty);
    }

    pub fn in_violation(&self, client: IpAddr) -> bool {
        self.tokens.in_violation(client)
    }

    pub fn penalty_secs(&self, client: IpAddr) -> u64 {
        if self.in_violation(client) {
            self.penalty_secs
        } else {
            0
        }
    }

    /// The reset rule: drop the whole window.
    pub fn reset_clients(&self) {
        self.tokens.clear();
    }
}

impl Refill for ConnectionLimiter {
    fn sleeptime(&self) -> Duration {
        self.sleeptime
    }

    fn tick(&self) {
        self.reset_clients();
        for client in self.tokens.violators() {
            self.hall.add(client);
        }
    }
}

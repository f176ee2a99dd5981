use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use super::bucket::TokenCounter;
use super::hall::HallOfShame;
use super::Refill;
use crate::config::RateLimiterConfig;

/// Counts bytes returned to each client. The refill worker does not wipe the
/// window: it divides every counter by the degradation factor and evicts
/// clients that have decayed below the floor.
pub struct SpeedLimiter {
    tokens: TokenCounter,
    reset_floor: u64,
    degradation_factor: u64,
    sleeptime: Duration,
    penalty_secs: u64,
    hall: Arc<HallOfShame>,
}

impl SpeedLimiter {
    pub fn new(cfg: &RateLimiterConfig, hall: Arc<HallOfShame>) -> Self {
        Self {
            tokens: TokenCounter::new(cfg.speedlimiter_max_download_limit_per_minute),
            reset_floor: cfg.speedlimiter_reset_download_limit_per_minute,
            degradation_factor: cfg.speedlimiter_degradation_factor,
            sleeptime: Duration::from_secs(cfg.speedlimiter_sleeptime),
            penalty_secs: cfg.speedlimiter_penaltytime,
            hall,
        }
    }

    /// Deduct `amount` bytes from the client's budget. `false` means the
    /// budget is exhausted (or the lock was contended).
    pub fn take(&self, client: IpAddr, amount: u64) -> bool {
        self.tokens.charge(client, amount)
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

    /// The reset rule: degrade, then evict everything below the floor.
    pub fn reset_clients(&self) {
        self.tokens.degrade(self.degradation_factor, self.reset_floor);
    }

    #[cfg(test)]
    pub fn counter(&self, client: IpAddr) -> Option<u64> {
        self.tokens.counter(client)
    }
}

impl Refill for SpeedLimiter {
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

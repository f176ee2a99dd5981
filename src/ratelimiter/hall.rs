use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

use ahash::{HashMap, HashMapExt};
use tracing::error;

/// Persistent-across-resets record of per-client violations. Shared by the
/// connection and speed limiters; strikes survive their reset cycles.
pub struct HallOfShame {
    strikes: Mutex<HashMap<IpAddr, u32>>,
    strikes_to_ban: u32,
}

impl HallOfShame {
    pub fn new(strikes_to_ban: u32) -> Self {
        Self {
            strikes: Mutex::new(HashMap::new()),
            strikes_to_ban,
        }
    }

    /// Record one strike. Crossing the ban threshold emits a critical log
    /// line naming the client.
    pub fn add(&self, client: IpAddr) {
        let mut strikes = self
            .strikes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = strikes.entry(client).or_insert(0);
        *count += 1;
        if *count == self.strikes_to_ban {
            error!(%client, strikes = *count, "CRITICAL: repeat violator reached the ban threshold");
        }
    }

    pub fn strikes(&self, client: IpAddr) -> u32 {
        self.strikes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&client)
            .copied()
            .unwrap_or(0)
    }
}

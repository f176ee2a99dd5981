use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

use ahash::{HashMap, HashMapExt};

/// Per-client token accounting shared by both limiters: a counter map behind
/// one lock, a ceiling, and the reset primitives.
///
/// Token operations acquire the lock non-blocking; failing to get it is a
/// rejection. Contended callers are shed, not queued; keep it that way.
/// Only the refill worker blocks on the lock.
pub(crate) struct TokenCounter {
    clients: Mutex<HashMap<IpAddr, u64>>,
    max: u64,
}

impl TokenCounter {
    pub fn new(max: u64) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            max,
        }
    }

    /// Add `amount` to the client's counter (creating it at `amount`).
    /// Returns `false` when the counter reaches or exceeds the ceiling, or
    /// when the lock is contended.
    pub fn charge(&self, client: IpAddr, amount: u64) -> bool {
        let Ok(mut clients) = self.clients.try_lock() else {
            return false;
        };
        let counter = clients.entry(client).or_insert(0);
        *counter = counter.saturating_add(amount);
        *counter < self.max
    }

    /// Whether a zero-amount probe would fail right now. Lock contention
    /// counts as a violation, same as in `charge`.
    pub fn in_violation(&self, client: IpAddr) -> bool {
        let Ok(clients) = self.clients.try_lock() else {
            return true;
        };
        clients.get(&client).copied().unwrap_or(0) >= self.max
    }

    /// Drop every counter. Blocking acquire: the refill worker waits.
    pub fn clear(&self) {
        self.lock_all().clear();
    }

    /// Divide every counter by `factor`, evicting entries that fall below
    /// `floor`. Blocking acquire.
    pub fn degrade(&self, factor: u64, floor: u64) {
        let mut clients = self.lock_all();
        for counter in clients.values_mut() {
            *counter /= factor.max(1);
        }
        clients.retain(|_, counter| *counter >= floor);
    }

    /// Clients whose counter still meets the ceiling. Blocking acquire.
    pub fn violators(&self) -> Vec<IpAddr> {
        self.lock_all()
            .iter()
            .filter(|&(_, &counter)| counter >= self.max)
            .map(|(client, _)| *client)
            .collect()
    }

    #[cfg(test)]
    pub fn counter(&self, client: IpAddr) -> Option<u64> {
        self.lock_all().get(&client).copied()
    }

    fn lock_all(&self) -> std::sync::MutexGuard<'_, HashMap<IpAddr, u64>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

use serde::{Deserialize, Serialize};

/// Rate-limiter tuning, the `[RateLimiter]` table of the config file. Key
/// names mirror the file format; every value has a built-in default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimiterConfig {
    /// Strikes before a client is called out in the log.
    #[serde(default = "default_strikes_to_ban")]
    pub hos_strikes_to_ban: u32,

    /// Byte budget per decay window (~1 MB).
    #[serde(default = "default_max_download")]
    pub speedlimiter_max_download_limit_per_minute: u64,

    /// Counters decaying below this are evicted (10 kB).
    #[serde(default = "default_reset_download")]
    pub speedlimiter_reset_download_limit_per_minute: u64,

    /// Seconds between speed-limiter decays.
    #[serde(default = "default_speed_sleeptime")]
    pub speedlimiter_sleeptime: u64,

    /// Accepted for config-file compatibility; the byte-side penalty is not
    /// charged anywhere.
    #[serde(default = "default_speed_penalty")]
    pub speedlimiter_penalty: u64,

    /// Divisor applied to every byte counter at each decay.
    #[serde(default = "default_degradation_factor")]
    pub speedlimiter_degradation_factor: u64,

    /// Back-off seconds reported to clients over the byte budget.
    #[serde(default = "default_speed_penaltytime")]
    pub speedlimiter_penaltytime: u64,

    /// Connection budget per reset window.
    #[serde(default = "default_connections_per_second")]
    pub connectionlimiter_connections_per_second: u64,

    /// Seconds between connection-window resets.
    #[serde(default = "default_connection_sleeptime")]
    pub connectionlimiter_sleeptime: u64,

    /// Connection-window tokens charged on protocol misbehavior.
    #[serde(default = "default_connection_penalty")]
    pub connectionlimiter_penalty: u64,

    /// Back-off seconds reported to clients over the connection budget.
    #[serde(default = "default_connection_penaltytime")]
    pub connectionlimiter_penaltytime: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            hos_strikes_to_ban: default_strikes_to_ban(),
            speedlimiter_max_download_limit_per_minute: default_max_download(),
            speedlimiter_reset_download_limit_per_minute: default_reset_download(),
            speedlimiter_sleeptime: default_speed_sleeptime(),
            speedlimiter_penalty: default_speed_penalty(),
            speedlimiter_degradation_factor: default_degradation_factor(),
            speedlimiter_penaltytime: default_speed_penaltytime(),
            connectionlimiter_connections_per_second: default_connections_per_second(),
            connectionlimiter_sleeptime: default_connection_sleeptime(),
            connectionlimiter_penalty: default_connection_penalty(),
            connectionlimiter_penaltytime: default_connection_penaltytime(),
        }
    }
}

fn default_strikes_to_ban() -> u32 {
    3
}

fn default_max_download() -> u64 {
    1000 * 1024
}

fn default_reset_download() -> u64 {
    10 * 1024
}

fn default_speed_sleeptime() -> u64 {
    60
}

fn default_speed_penalty() -> u64 {
    1000
}

fn default_degradation_factor() -> u64 {
    4
}

fn default_speed_penaltytime() -> u64 {
    60
}

fn default_connections_per_second() -> u64 {
    10
}

fn default_connection_sleeptime() -> u64 {
    1
}

fn default_connection_penalty() -> u64 {
    1
}

fn default_connection_penaltytime() -> u64 {
    1
}

//! Default values for configuration fields.
//!
//! Kept in one place so the serde `default = "..."` attributes and
//! `Default` impls cannot drift apart.

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8090
}

/// 0 means "one worker per logical CPU".
pub fn default_workers() -> usize {
    0
}

pub fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

pub fn default_poll_interval_ms() -> u64 {
    5_000
}

pub fn default_max_connections() -> usize {
    100
}

pub fn default_outbound_buffer_depth() -> usize {
    16
}

pub fn default_backpressure_grace_cycles() -> u32 {
    3
}

pub fn default_fetch_timeout_ms() -> u64 {
    2_000
}

/// Reconnect delay hint pushed to clients on the `retry:` line.
pub fn default_retry_hint_ms() -> u64 {
    3_000
}

pub fn default_symbols() -> Vec<String> {
    Vec::new()
}

pub fn default_jwt_secret() -> String {
    // Dev-only fallback; deployments override via TICKSTREAM_JWT_SECRET.
    "tickstream-dev-secret".to_string()
}

pub fn default_jwt_issuer() -> String {
    "tickstream".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_logs_path() -> String {
    "logs".to_string()
}

pub fn default_true() -> bool {
    true
}

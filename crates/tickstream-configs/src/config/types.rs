use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default, alias = "authentication")]
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of actix workers; 0 = one per logical CPU.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

/// Streaming core settings. These are the recognized knobs of the streaming
/// subsystem; everything else is fixed by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Per-connection heartbeat cadence.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Change-detector poll cadence; independent of connection count.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Hard per-instance connection ceiling.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-connection outbound buffer depth; also the resume-window depth.
    #[serde(default = "default_outbound_buffer_depth")]
    pub outbound_buffer_depth: usize,
    /// Poll cycles a saturated connection survives before forced disconnect.
    #[serde(default = "default_backpressure_grace_cycles")]
    pub backpressure_grace_cycles: u32,
    /// Upper bound on one partition fetch within a poll cycle.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Reconnect delay hint sent to clients.
    #[serde(default = "default_retry_hint_ms")]
    pub retry_hint_ms: u64,
    /// Symbols tracked by the poller when the deployment seeds the in-memory
    /// store. Deployments with an external quote store leave this empty.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_connections: default_max_connections(),
            outbound_buffer_depth: default_outbound_buffer_depth(),
            backpressure_grace_cycles: default_backpressure_grace_cycles(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            retry_hint_ms: default_retry_hint_ms(),
            symbols: default_symbols(),
        }
    }
}

impl StreamSettings {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// The backpressure grace period expressed as wall time.
    pub fn backpressure_grace(&self) -> Duration {
        self.poll_interval() * self.backpressure_grace_cycles
    }
}

/// Settings for consuming already-issued identity claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_jwt_issuer(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "compact" or "json" for the file layer.
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            logs_path: default_logs_path(),
            log_to_console: default_true(),
        }
    }
}

use super::types::ServerConfig;
use std::fs;
use std::path::Path;

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Note: environment overrides are applied separately via
    /// `apply_env_overrides()`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        Ok(config)
    }

    /// Apply recognized `TICKSTREAM_*` environment variables on top of the
    /// loaded (or default) configuration. Unparseable values are rejected so
    /// a typo fails the boot instead of silently running with defaults.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Some(host) = read_env("TICKSTREAM_HOST") {
            self.server.host = host;
        }
        if let Some(port) = read_env("TICKSTREAM_PORT") {
            self.server.port = parse_env("TICKSTREAM_PORT", &port)?;
        }
        if let Some(v) = read_env("TICKSTREAM_HEARTBEAT_INTERVAL_MS") {
            self.stream.heartbeat_interval_ms =
                parse_env("TICKSTREAM_HEARTBEAT_INTERVAL_MS", &v)?;
        }
        if let Some(v) = read_env("TICKSTREAM_POLL_INTERVAL_MS") {
            self.stream.poll_interval_ms = parse_env("TICKSTREAM_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = read_env("TICKSTREAM_MAX_CONNECTIONS") {
            self.stream.max_connections = parse_env("TICKSTREAM_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = read_env("TICKSTREAM_BUFFER_DEPTH") {
            self.stream.outbound_buffer_depth = parse_env("TICKSTREAM_BUFFER_DEPTH", &v)?;
        }
        if let Some(v) = read_env("TICKSTREAM_GRACE_CYCLES") {
            self.stream.backpressure_grace_cycles = parse_env("TICKSTREAM_GRACE_CYCLES", &v)?;
        }
        if let Some(v) = read_env("TICKSTREAM_FETCH_TIMEOUT_MS") {
            self.stream.fetch_timeout_ms = parse_env("TICKSTREAM_FETCH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = read_env("TICKSTREAM_SYMBOLS") {
            self.stream.symbols = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(secret) = read_env("TICKSTREAM_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = read_env("TICKSTREAM_JWT_ISSUER") {
            self.auth.jwt_issuer = issuer;
        }
        if let Some(level) = read_env("TICKSTREAM_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            ));
        }

        if self.stream.max_connections == 0 {
            return Err(anyhow::anyhow!("stream.max_connections cannot be 0"));
        }
        if self.stream.outbound_buffer_depth == 0 {
            return Err(anyhow::anyhow!("stream.outbound_buffer_depth cannot be 0"));
        }
        if self.stream.backpressure_grace_cycles == 0 {
            return Err(anyhow::anyhow!(
                "stream.backpressure_grace_cycles cannot be 0"
            ));
        }
        if self.stream.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("stream.poll_interval_ms cannot be 0"));
        }
        if self.stream.heartbeat_interval_ms == 0 {
            return Err(anyhow::anyhow!("stream.heartbeat_interval_ms cannot be 0"));
        }
        if self.stream.fetch_timeout_ms >= self.stream.poll_interval_ms {
            return Err(anyhow::anyhow!(
                "stream.fetch_timeout_ms ({}) must be below stream.poll_interval_ms ({})",
                self.stream.fetch_timeout_ms,
                self.stream.poll_interval_ms
            ));
        }

        Ok(())
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, value, e))
}

//! # tickstream-configs
//!
//! Configuration loading for the tickstream server: a TOML file with serde
//! field defaults, followed by `TICKSTREAM_*` environment overrides, followed
//! by validation. Every setting has a working default so the server can start
//! with no config file at all.

pub mod config;

pub use config::types::{
    AuthSettings, LoggingSettings, ServerConfig, ServerSettings, StreamSettings,
};

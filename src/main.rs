// tickstream server entrypoint
//!
//! The heavy lifting (component wiring, HTTP server, graceful shutdown)
//! lives in dedicated modules so this file remains a thin orchestrator.

mod lifecycle;
mod logging;

use anyhow::Result;
use lifecycle::{bootstrap, run};
use log::info;
use tickstream_configs::ServerConfig;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration; a missing file falls back to the built-in defaults,
    // a broken one is fatal.
    let config_path = "config.toml";
    let mut config = if std::path::Path::new(config_path).exists() {
        match ServerConfig::from_file(config_path) {
            Ok(cfg) => {
                eprintln!("Loaded config from: {}", config_path);
                cfg
            }
            Err(e) => {
                eprintln!("FATAL: Failed to load {}: {}", config_path, e);
                std::process::exit(1);
            }
        }
    } else {
        ServerConfig::default()
    };

    config.apply_env_overrides()?;
    config.validate()?;

    // Logging before any other side effects
    let server_log_path = format!("{}/server.log", config.logging.logs_path);
    logging::init_logging(
        &config.logging.level,
        &server_log_path,
        config.logging.log_to_console,
        &config.logging.format,
    )?;

    let version = env!("CARGO_PKG_VERSION");
    info!("tickstream server v{}", version);
    info!("Host: {}  Port: {}", config.server.host, config.server.port);
    info!(
        "Stream: poll={}ms heartbeat={}ms max_connections={} buffer_depth={} grace_cycles={}",
        config.stream.poll_interval_ms,
        config.stream.heartbeat_interval_ms,
        config.stream.max_connections,
        config.stream.outbound_buffer_depth,
        config.stream.backpressure_grace_cycles,
    );

    // Build application state and kick off background services
    let components = bootstrap(&config).await?;

    // Run HTTP server until termination signal is received
    run(&config, components).await
}

//! Server lifecycle management helpers.
//!
//! This module encapsulates the heavy lifting otherwise handled directly in
//! `main.rs`: bootstrapping the streaming core, wiring the HTTP server, and
//! coordinating graceful shutdown.

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickstream_api::{configure_routes, AuthConfig};
use tickstream_commons::SymbolId;
use tickstream_configs::ServerConfig;
use tickstream_core::{
    AdmissionGate, ChangeDetector, ConnectionRegistry, EventBus, EventComposer, MemoryQuoteStore,
    MemoryWatchlistProvider, QuoteStore, StreamContext, StreamRuntimeSettings, WatchlistProvider,
};
use tickstream_observability::{collect_runtime_metrics, StreamMetrics};
use tokio_util::sync::CancellationToken;

/// Aggregated application components shared across the HTTP server and
/// shutdown handling.
pub struct ApplicationComponents {
    pub context: Arc<StreamContext>,
    pub gate: Arc<AdmissionGate>,
    /// Default in-process quote store; deployments with an external store
    /// wire their own `QuoteStore` here instead.
    pub quote_store: Arc<MemoryQuoteStore>,
    pub watchlists: Arc<MemoryWatchlistProvider>,
    pub detector: tokio::task::JoinHandle<()>,
}

/// Build the streaming core and start the change detector.
pub async fn bootstrap(config: &ServerConfig) -> Result<ApplicationComponents> {
    let phase_start = Instant::now();

    let metrics = Arc::new(StreamMetrics::new());
    let registry = ConnectionRegistry::new(config.stream.max_connections);
    let bus = EventBus::new(config.stream.outbound_buffer_depth);
    let composer = Arc::new(EventComposer::new(Some(config.stream.retry_hint_ms)));
    let shutdown = CancellationToken::new();

    let symbols: Vec<SymbolId> = config
        .stream
        .symbols
        .iter()
        .map(|s| SymbolId::new(s.clone()))
        .collect();
    let quote_store = Arc::new(MemoryQuoteStore::new(symbols.clone()));
    let watchlists = Arc::new(MemoryWatchlistProvider::new());

    let settings = StreamRuntimeSettings {
        heartbeat_interval: config.stream.heartbeat_interval(),
        poll_interval: config.stream.poll_interval(),
        fetch_timeout: config.stream.fetch_timeout(),
        backpressure_grace: config.stream.backpressure_grace(),
        outbound_buffer_depth: config.stream.outbound_buffer_depth,
    };

    let context = StreamContext::new(
        Arc::clone(&bus),
        Arc::clone(&composer),
        Arc::clone(&registry),
        Arc::clone(&metrics),
        settings,
        shutdown.clone(),
    );

    let watchlist_provider: Arc<dyn WatchlistProvider> = watchlists.clone();
    let gate = AdmissionGate::new(Arc::clone(&registry), watchlist_provider, Arc::clone(&metrics));

    // The poller runs from process start, even with zero connections, so a
    // fresh connection sees an up-to-date watermark immediately.
    let store: Arc<dyn QuoteStore> = quote_store.clone();
    let detector = ChangeDetector::new(
        store,
        bus,
        composer,
        Arc::clone(&metrics),
        config.stream.poll_interval(),
        config.stream.fetch_timeout(),
        shutdown.clone(),
    )
    .spawn();
    info!(
        "Change detector started ({} tracked symbols, every {}ms)",
        symbols.len(),
        config.stream.poll_interval_ms
    );

    info!("Runtime: {}", collect_runtime_metrics(phase_start).to_log_string());
    debug!(
        "Streaming core initialized ({:.2}ms)",
        phase_start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(ApplicationComponents {
        context,
        gate,
        quote_store,
        watchlists,
        detector,
    })
}

/// Run the HTTP server until a termination signal arrives, then drain.
pub async fn run(config: &ServerConfig, components: ApplicationComponents) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", bind_addr);
    debug!("Endpoints: GET /v1/stream, GET /v1/stream/{{watchlist_id}}, GET /v1/api/healthcheck");

    let workers = if config.server.workers == 0 {
        num_cpus::get()
    } else {
        config.server.workers
    };

    let context = Arc::clone(&components.context);
    let gate = Arc::clone(&components.gate);
    let auth_config = AuthConfig {
        jwt_secret: config.auth.jwt_secret.clone(),
        jwt_issuer: config.auth.jwt_issuer.clone(),
    };

    let app_context = Arc::clone(&context);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&app_context)))
            .app_data(web::Data::new(Arc::clone(&gate)))
            .app_data(web::Data::new(auth_config.clone()))
            .configure(configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let shutdown = context.shutdown.clone();
    let registry = Arc::clone(&context.registry);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            // Stop admitting, cancel dispatcher and poller tasks, then stop
            // accepting HTTP traffic.
            registry.begin_shutdown();
            shutdown.cancel();
            server_handle.stop(true).await;
        }
    });

    server.await?;

    // Belt and braces for non-signal exits
    context.registry.begin_shutdown();
    context.shutdown.cancel();

    // Dispatchers observe the cancelled token and release their slots
    let deadline = Instant::now() + Duration::from_secs(5);
    while context.registry.active_connections() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let remaining = context.registry.active_connections();
    if remaining > 0 {
        warn!("{} connections still active at shutdown deadline", remaining);
    }

    let _ = components.detector.await;
    info!("Shutdown complete");
    Ok(())
}

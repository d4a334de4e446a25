//! API routes configuration.
//!
//! All endpoints use the /v1 version prefix:
//! - GET /v1/stream - Global event stream (no auth)
//! - GET /v1/stream/{watchlist_id} - Bound event stream (requires auth)
//! - GET /v1/api/healthcheck - Health check endpoint

use crate::handlers;
use actix_web::web;

/// Configure API routes for the streaming server.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .service(handlers::global_stream)
            .service(handlers::watchlist_stream)
            .service(
                web::scope("/api").route("/healthcheck", web::get().to(handlers::healthcheck)),
            ),
    );
}

//! Health check endpoint.

use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tickstream_core::StreamContext;

/// GET /v1/api/healthcheck
pub async fn healthcheck(ctx: web::Data<Arc<StreamContext>>) -> HttpResponse {
    let snapshot = ctx.metrics.snapshot(ctx.registry.active_connections());
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "max_connections": ctx.registry.max_connections(),
        "metrics": snapshot,
    }))
}

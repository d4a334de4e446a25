//! Stream endpoints.
//!
//! Both endpoints return a long-lived `text/event-stream` body fed by the
//! connection's dispatcher. Admission failures come back as immediate HTTP
//! statuses; once streaming starts, the only failure signal a client gets is
//! the stream ending.

use crate::error::ApiError;
use crate::AuthConfig;
use actix_web::{get, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::{info, warn};
use std::sync::Arc;
use tickstream_auth::{extract_bearer, validate_token, AuthError, AuthenticatedUser};
use tickstream_commons::{EventId, WatchlistId};
use tickstream_core::dispatcher::FrameReceiver;
use tickstream_core::{spawn_dispatcher, AdmissionGate, StreamContext};

/// GET /v1/stream - global scope: no auth, every partition.
#[get("/stream")]
pub async fn global_stream(
    req: HttpRequest,
    ctx: web::Data<Arc<StreamContext>>,
    gate: web::Data<Arc<AdmissionGate>>,
) -> Result<HttpResponse, ApiError> {
    let admitted = gate.admit_global()?;
    info!("Global stream admitted: {}", admitted.connection.id);

    let resume = parse_last_event_id(&req);
    let frames = spawn_dispatcher(admitted, &ctx, resume);
    Ok(sse_response(frames))
}

/// GET /v1/stream/{watchlist_id} - bound scope: requires a valid claim and
/// ownership of the watchlist; the filter is the watchlist's symbol set.
#[get("/stream/{watchlist_id}")]
pub async fn watchlist_stream(
    req: HttpRequest,
    path: web::Path<String>,
    ctx: web::Data<Arc<StreamContext>>,
    gate: web::Data<Arc<AdmissionGate>>,
    auth: web::Data<AuthConfig>,
) -> Result<HttpResponse, ApiError> {
    let watchlist_id = WatchlistId::new(path.into_inner());

    // A present-but-invalid claim is an auth error; an absent one is passed
    // through so the gate rejects with its own Unauthenticated reason.
    let identity = authenticate(&req, &auth)?;
    if identity.is_none() {
        warn!("Bound stream request for {} without credentials", watchlist_id);
    }

    let user_id = identity.as_ref().map(|user| &user.user_id);
    let admitted = gate.admit_bound(user_id, &watchlist_id).await?;
    info!(
        "Bound stream admitted: {} (watchlist={})",
        admitted.connection.id, watchlist_id
    );

    let resume = parse_last_event_id(&req);
    let frames = spawn_dispatcher(admitted, &ctx, resume);
    Ok(sse_response(frames))
}

fn authenticate(
    req: &HttpRequest,
    auth: &AuthConfig,
) -> Result<Option<AuthenticatedUser>, ApiError> {
    let header = match req.headers().get("Authorization") {
        Some(header) => header,
        None => return Ok(None),
    };
    let header = header.to_str().map_err(|_| {
        AuthError::MalformedAuthorization("Header contains invalid characters".to_string())
    })?;
    let token = extract_bearer(header)?;
    let user = validate_token(token, &auth.jwt_secret, &auth.jwt_issuer)?;
    Ok(Some(user))
}

/// The client's last received id, sent back on reconnect via the standard
/// resume header. Ids from another process instance fail to parse and fall
/// through to a fresh admission.
fn parse_last_event_id(req: &HttpRequest) -> Option<EventId> {
    req.headers()
        .get("Last-Event-ID")
        .and_then(|value| value.to_str().ok())
        .and_then(EventId::parse)
}

fn sse_response(frames: FrameReceiver) -> HttpResponse {
    let mut frames = frames;
    let body = futures_util::stream::poll_fn(move |cx| frames.poll_recv(cx))
        .map(|frame| Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(frame)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(body)
}

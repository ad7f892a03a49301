//! HTTP router construction for the journey tracker.
//!
//! The beacon contract requires every response — success, validation
//! error, 404, 405, or a bare `OPTIONS` preflight — to carry the same
//! three CORS headers unconditionally. `tower_http::cors::CorsLayer`
//! only decorates responses it recognizes as an actual preflight
//! request, so a plain `OPTIONS` without the `Access-Control-Request-*`
//! headers (or a 404/405 it never sees because the path/method never
//! matched) would come back without them. `SetResponseHeaderLayer`
//! stamps the headers onto every response the router produces, matching
//! `original_source/lambda/journey-tracker/handler.py`'s `_response()`
//! helper, which sets them unconditionally too.

use axum::handler::Handler;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{post, MethodRouter};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers::{track_batch, track_single};
use crate::state::SharedState;

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}

async fn method_not_allowed() -> (StatusCode, Json<Value>) {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({"error": "Method not allowed"})))
}

async fn options_ok() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({})))
}

/// `POST` for the real handler, `OPTIONS` returning an unconditional 200,
/// anything else falling through to a JSON 405 — rather than axum's
/// default empty-body one.
fn tracking_route<H, T>(handler: H) -> MethodRouter<SharedState>
where
    H: Handler<T, SharedState>,
    T: 'static,
{
    post(handler).options(options_ok).fallback(method_not_allowed)
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/t", tracking_route(track_single))
        .route("/t/batch", tracking_route(track_batch))
        .fallback(not_found)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("OPTIONS,POST"),
        ))
        .with_state(state)
}

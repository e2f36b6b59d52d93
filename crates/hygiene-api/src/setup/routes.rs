//! Route configuration and setup

use crate::constants::API_PREFIX;
use crate::handlers;
use axum::{routing::get, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const MAX_CONCURRENT_REQUESTS: usize = 256;
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes() -> Router {
    Router::new()
        .route(
            &format!("{}/heartbeat", API_PREFIX),
            get(handlers::heartbeat::heartbeat),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
}

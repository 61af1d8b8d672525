//! HTTP surface for the checkout integration
//!
//! Public entry points are parameterized by order hash; the webhook is a
//! single endpoint authenticated by its HMAC signature.

pub mod checkout;
pub mod health;
pub mod webhook;

use crate::payments::ReconciliationEngine;
use axum::http::HeaderName;
use axum::routing::{any, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub environment: String,
}

impl AppState {
    pub fn new(engine: Arc<ReconciliationEngine>, environment: impl Into<String>) -> Self {
        Self {
            engine,
            environment: environment.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/initialize/:hash", post(checkout::initialize))
        .route(
            "/payment-successful/:hash",
            get(checkout::payment_successful).post(checkout::payment_successful),
        )
        .route("/cancel-url/:hash", get(checkout::payment_cancelled))
        // Non-POST methods are answered by the handler, not with a 405
        .route("/webhook", any(webhook::paystack_webhook))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;

use crate::api::AppState;
use crate::payments::traits::TransactionInitializer;
use crate::payments::webhook::SIGNATURE_HEADER;

/// Paystack webhook receiver
///
/// The body is kept raw: the signature covers the exact bytes sent.
pub async fn paystack_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let reply = state
        .engine
        .confirm_by_webhook(&method, signature, &body)
        .await;

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, reply.message)
}

//! Checkout entry points: initialize, return confirmation and cancellation

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::{PaymentError, TRANSACTION_FAILED_MESSAGE};
use crate::payments::traits::TransactionInitializer;

/// Query parameter carrying a one-shot warning for the checkout page
pub const WARNING_PARAM: &str = "payment_warning";

#[derive(Debug, Default, Deserialize)]
pub struct InitializeRequest {
    #[serde(default, deserialize_with = "truthy")]
    pub create_payment_profile: bool,
}

/// Checkbox-style flag: `true`, `1`, `"1"`, `"true"`, `"on"` and `"yes"` all count
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
        _ => false,
    };
    Ok(flag)
}

/// `reference` and `trxref` as Paystack sends them on return
#[derive(Debug, Default, Deserialize)]
pub struct ReturnParams {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

impl ReturnParams {
    fn merge(self, other: ReturnParams) -> ReturnParams {
        ReturnParams {
            reference: self.reference.or(other.reference),
            trxref: self.trxref.or(other.trxref),
        }
    }

    fn reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .filter(|r| !r.is_empty())
            .or(self.trxref.as_deref())
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

// Form or JSON by content type; an empty or malformed body is treated as "no fields"
fn request_body<T: Default + for<'de> Deserialize<'de>>(headers: &HeaderMap, body: &[u8]) -> T {
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    let parsed = if is_form(headers) {
        serde_urlencoded::from_bytes(body).map_err(|err| err.to_string())
    } else {
        serde_json::from_slice(body).map_err(|err| err.to_string())
    };
    parsed.unwrap_or_else(|err| {
        warn!("Ignoring malformed checkout request body: {}", err);
        T::default()
    })
}

/// Checkout page URL, optionally carrying a warning for the payer
fn checkout_redirect(state: &AppState, warning: Option<&str>) -> Response {
    let checkout_url = &state.engine.settings().checkout_url;
    let target = match (warning, Url::parse(checkout_url)) {
        (Some(message), Ok(mut url)) => {
            url.query_pairs_mut().append_pair(WARNING_PARAM, message);
            url.to_string()
        }
        _ => checkout_url.clone(),
    };
    Redirect::to(&target).into_response()
}

pub async fn initialize(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, PaymentError> {
    let request: InitializeRequest = request_body(&headers, &body);

    let data = state
        .engine
        .initialize_transaction(&hash, request.create_payment_profile)
        .await?;

    Ok(Json(data).into_response())
}

pub async fn payment_successful(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(query): Query<ReturnParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = query.merge(request_body(&headers, &body));
    let result = state
        .engine
        .confirm_by_return(&hash, params.reference())
        .await;

    let redirect = !state.engine.settings().completes_payment_on_client();
    match (result, redirect) {
        (Ok(()), true) => checkout_redirect(&state, None),
        (Ok(()), false) => Json(json!({ "success": true })).into_response(),
        (Err(err), true) => {
            warn!("Payment confirmation for order {} failed: {}", hash, err);
            checkout_redirect(&state, Some(TRANSACTION_FAILED_MESSAGE))
        }
        (Err(err), false) => err.into_response(),
    }
}

pub async fn payment_cancelled(State(state): State<AppState>, Path(hash): Path<String>) -> Response {
    let processed = match state.engine.find_order(&hash).await {
        Ok(order) => order.is_payment_processed,
        Err(err) => {
            warn!("Cancellation for unknown order {}: {}", hash, err);
            false
        }
    };

    if processed {
        checkout_redirect(&state, None)
    } else {
        info!("Payer cancelled payment for order {}", hash);
        checkout_redirect(&state, Some(TRANSACTION_FAILED_MESSAGE))
    }
}

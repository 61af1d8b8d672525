use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::payments::types::{IntegrationType, TransactionMode};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub mode: TransactionMode,
    pub integration_type: IntegrationType,
    pub paystack_configured: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let settings = state.engine.settings();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.environment.clone(),
        mode: settings.mode,
        integration_type: settings.integration_type,
        paystack_configured: settings.is_configured(),
    };

    Ok(Json(response))
}

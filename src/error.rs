//! Error taxonomy for the checkout integration
//!
//! Every reconciliation failure surfaces as a `PaymentError`. The `Display`
//! text of each variant is safe to show to the payer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

pub const TRANSACTION_FAILED_MESSAGE: &str =
    "Sorry, there was an error processing your payment. Please try again later.";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    /// Transport failure or a failure reported by Paystack itself
    #[error("{message}")]
    Remote { message: String },

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("Order hash mismatch.")]
    OrderHashMismatch,

    #[error("Amount mismatch.")]
    AmountMismatch { expected: i64, actual: i64 },

    #[error("Sorry, there was an error processing your payment. Please try again later.")]
    TransactionFailed,

    #[error("Payment profile not found.")]
    ProfileNotFound,

    #[error("Payment Error -> {message}")]
    ChargeFailed { message: String },

    #[error("Nothing to refund.")]
    NothingToRefund,

    #[error("Payment not settled.")]
    NotSettled,

    #[error("Refund amount should be less than total")]
    RefundExceedsTotal,

    #[error("Refund Failed -> {message}")]
    RefundFailed { message: String },

    #[error("Order total is below the minimum required for this payment method")]
    NotApplicable,

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PaymentError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// HTTP status used when the error is returned to a JSON caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::ProfileNotFound => StatusCode::NOT_FOUND,
            Self::Storage { .. } | Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Tamper or integrity defenses tripped
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::OrderHashMismatch | Self::AmountMismatch { .. })
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaymentError::remote("Request to Paystack timed out")
        } else {
            PaymentError::remote(format!("Request error: {}", err))
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage and configuration details stay in the logs
        let message = match &self {
            Self::Storage { .. } | Self::Configuration { .. } => {
                tracing::error!("{}", self);
                TRANSACTION_FAILED_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

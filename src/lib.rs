//! Paystack checkout integration
//!
//! Starts Paystack transactions for host orders and reconciles their outcome
//! from the payer's return and from signed webhooks, with saved-card charges
//! and refunds on top.

pub mod api;
pub mod config;
pub mod error;
pub mod payments;

#[cfg(feature = "cache")]
pub mod cache;
#[cfg(feature = "database")]
pub mod database;

pub use error::{PaymentError, PaymentResult};
pub use payments::ReconciliationEngine;

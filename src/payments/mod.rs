//! Paystack payment integration
//!
//! Transaction initialization, return and webhook reconciliation, saved
//! cards and refunds for orders owned by a host order system.

pub mod intent;
pub mod metadata;
pub mod providers;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod webhook;

pub use reconciliation::ReconciliationEngine;

//! Payment gateway clients

pub mod paystack;

pub use paystack::{PaystackClient, PaystackConfig};

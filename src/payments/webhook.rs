//! Paystack webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Hex HMAC-SHA512 of `payload` under `secret_key`
pub fn sign(secret_key: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check the `x-paystack-signature` header against the raw, unparsed body
///
/// The comparison runs in constant time over the decoded digest.
pub fn verify_signature(secret_key: &str, payload: &[u8], signature: &str) -> bool {
    let provided = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac =
        HmacSha512::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

//! Redis key layout

pub const INTENT_PREFIX: &str = "paystack:intent";

/// Key holding the checkout intent for an order
pub fn intent_key(order_hash: &str) -> String {
    format!("{}:{}", INTENT_PREFIX, order_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_key() {
        assert_eq!(intent_key("a1b2c3"), "paystack:intent:a1b2c3");
    }
}

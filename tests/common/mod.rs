//! In-memory host implementations and a scripted Paystack stand-in

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use paystack_checkout::config::PaymentSettings;
use paystack_checkout::error::{PaymentError, PaymentResult};
use paystack_checkout::payments::intent::InMemoryIntentStore;
use paystack_checkout::payments::traits::{OrderRepository, PaymentGateway, ProfileRepository};
use paystack_checkout::payments::types::{
    GatewayResponse, IntegrationType, NewPaymentAttempt, Order, PaymentAttempt, PaymentProfile,
    RefundData, TransactionData,
};
use paystack_checkout::payments::ReconciliationEngine;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const SECRET_KEY: &str = "sk_test_0123456789abcdef";
pub const ORDER_HASH: &str = "a1b2c3d4e5";
pub const REFERENCE: &str = "ref_123";
pub const SETTLED_STATUS: i32 = 5;

pub fn order() -> Order {
    Order {
        hash: ORDER_HASH.to_string(),
        order_id: 1042,
        customer_id: Some(7),
        first_name: "Ada".to_string(),
        last_name: "Obi".to_string(),
        email: "ada@example.com".to_string(),
        telephone: Some("+2348000000000".to_string()),
        order_total: dec!(100.00),
        status_id: 1,
        is_payment_processed: false,
    }
}

pub fn settings(integration_type: IntegrationType) -> PaymentSettings {
    PaymentSettings {
        integration_type,
        test_secret_key: SECRET_KEY.to_string(),
        order_status: SETTLED_STATUS,
        public_base_url: "https://shop.example.com/paystack".to_string(),
        checkout_url: "https://shop.example.com/checkout".to_string(),
        ..Default::default()
    }
}

pub fn authorization() -> Value {
    json!({
        "authorization_code": "AUTH_abc",
        "card_type": "Visa",
        "last4": "4081",
        "exp_month": "12",
        "reusable": true
    })
}

/// Transaction data as Paystack returns it for `order()`
pub fn transaction(status: &str, amount: i64, order_hash: &str) -> Value {
    json!({
        "reference": REFERENCE,
        "status": status,
        "amount": amount,
        "currency": "NGN",
        "gateway_response": "Approved",
        "metadata": { "order_hash": order_hash, "custom_fields": [] },
        "authorization": authorization()
    })
}

pub fn ok_response(data: Value) -> Value {
    json!({ "status": true, "message": "Verification successful", "data": data })
}

/// Paystack stand-in answering each operation with a scripted response
pub struct FakeGateway {
    pub initialize: Mutex<PaymentResult<Value>>,
    pub verify: Mutex<PaymentResult<Value>>,
    pub charge: Mutex<PaymentResult<Value>>,
    pub refund: Mutex<PaymentResult<Value>>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        let unscripted = || Err(PaymentError::remote("unscripted call"));
        Self {
            initialize: Mutex::new(unscripted()),
            verify: Mutex::new(unscripted()),
            charge: Mutex::new(unscripted()),
            refund: Mutex::new(unscripted()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn script(slot: &Mutex<PaymentResult<Value>>, response: PaymentResult<Value>) {
        *slot.lock().unwrap() = response;
    }

    pub fn calls_to(&self, operation: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == operation)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    fn answer<T: Default + DeserializeOwned>(
        &self,
        operation: &str,
        payload: Value,
        slot: &Mutex<PaymentResult<Value>>,
    ) -> PaymentResult<GatewayResponse<T>> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), payload));
        let response = slot.lock().unwrap().clone()?;
        Ok(serde_json::from_value(response).unwrap())
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize_transaction(
        &self,
        payload: &Value,
    ) -> PaymentResult<GatewayResponse<TransactionData>> {
        self.answer("initialize", payload.clone(), &self.initialize)
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> PaymentResult<GatewayResponse<TransactionData>> {
        self.answer("verify", json!(reference), &self.verify)
    }

    async fn charge_authorization(
        &self,
        payload: &Value,
    ) -> PaymentResult<GatewayResponse<TransactionData>> {
        self.answer("charge", payload.clone(), &self.charge)
    }

    async fn create_refund(
        &self,
        transaction: &str,
        amount: i64,
    ) -> PaymentResult<GatewayResponse<RefundData>> {
        self.answer(
            "refund",
            json!({ "transaction": transaction, "amount": amount }),
            &self.refund,
        )
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    pub orders: Mutex<HashMap<String, Order>>,
    pub attempts: Mutex<Vec<PaymentAttempt>>,
    pub unavailable: AtomicBool,
    pub refund_marking_fails: AtomicBool,
}

impl InMemoryOrders {
    pub fn with_order(order: Order) -> Self {
        let orders = Self::default();
        orders.insert(order);
        orders
    }

    pub fn insert(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.hash.clone(), order);
    }

    pub fn get(&self, hash: &str) -> Order {
        self.orders.lock().unwrap()[hash].clone()
    }

    pub fn attempts(&self) -> Vec<PaymentAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn final_attempts(&self) -> Vec<PaymentAttempt> {
        self.attempts().into_iter().filter(|a| a.is_final).collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_refund_marking_fails(&self, fails: bool) {
        self.refund_marking_fails.store(fails, Ordering::SeqCst);
    }

    fn check_available(&self) -> PaymentResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentError::storage("database unavailable"));
        }
        Ok(())
    }

    fn append(&self, order: &Order, attempt: NewPaymentAttempt) -> PaymentAttempt {
        let record = PaymentAttempt {
            id: Uuid::new_v4(),
            order_hash: order.hash.clone(),
            message: attempt.message,
            is_success: attempt.is_success,
            request: attempt.request,
            response: attempt.response,
            is_final: attempt.is_final,
            refunded_at: None,
            created_at: Utc::now(),
        };
        self.attempts.lock().unwrap().push(record.clone());
        record
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn find_by_hash(&self, hash: &str) -> PaymentResult<Option<Order>> {
        self.check_available()?;
        Ok(self.orders.lock().unwrap().get(hash).cloned())
    }

    async fn log_payment_attempt(
        &self,
        order: &Order,
        attempt: NewPaymentAttempt,
    ) -> PaymentResult<PaymentAttempt> {
        self.check_available()?;
        Ok(self.append(order, attempt))
    }

    async fn settle(
        &self,
        order: &Order,
        status_id: i32,
        attempt: NewPaymentAttempt,
    ) -> PaymentResult<bool> {
        self.check_available()?;
        {
            let mut orders = self.orders.lock().unwrap();
            let stored = match orders.get_mut(&order.hash) {
                Some(stored) if !stored.is_payment_processed => stored,
                _ => return Ok(false),
            };
            stored.status_id = status_id;
            stored.is_payment_processed = true;
        }
        self.append(order, attempt);
        Ok(true)
    }

    async fn mark_attempt_refunded(&self, attempt_id: Uuid) -> PaymentResult<()> {
        self.check_available()?;
        if self.refund_marking_fails.load(Ordering::SeqCst) {
            return Err(PaymentError::storage("deadlock detected"));
        }
        let mut attempts = self.attempts.lock().unwrap();
        match attempts.iter_mut().find(|a| a.id == attempt_id) {
            Some(attempt) => {
                attempt.refunded_at = Some(Utc::now());
                Ok(())
            }
            None => Err(PaymentError::not_found("Payment log")),
        }
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    pub profiles: Mutex<HashMap<i64, PaymentProfile>>,
}

impl InMemoryProfiles {
    pub fn get(&self, customer_id: i64) -> Option<PaymentProfile> {
        self.profiles.lock().unwrap().get(&customer_id).cloned()
    }

    pub fn insert(&self, profile: PaymentProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.customer_id, profile);
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfiles {
    async fn find_profile(&self, customer_id: i64) -> PaymentResult<Option<PaymentProfile>> {
        Ok(self.get(customer_id))
    }

    async fn save_profile(&self, profile: &PaymentProfile) -> PaymentResult<()> {
        self.insert(profile.clone());
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<ReconciliationEngine>,
    pub gateway: Arc<FakeGateway>,
    pub orders: Arc<InMemoryOrders>,
    pub profiles: Arc<InMemoryProfiles>,
    pub intents: Arc<InMemoryIntentStore>,
}

impl Harness {
    pub fn new(integration_type: IntegrationType) -> Self {
        Self::with_settings(settings(integration_type))
    }

    pub fn with_settings(settings: PaymentSettings) -> Self {
        let gateway = Arc::new(FakeGateway::default());
        let orders = Arc::new(InMemoryOrders::with_order(order()));
        let profiles = Arc::new(InMemoryProfiles::default());
        let intents = Arc::new(InMemoryIntentStore::default());

        let engine = ReconciliationEngine::new(
            settings,
            gateway.clone(),
            orders.clone(),
            profiles.clone(),
            intents.clone(),
        );

        Self {
            engine: Arc::new(engine),
            gateway,
            orders,
            profiles,
            intents,
        }
    }

    pub fn order(&self) -> Order {
        self.orders.get(ORDER_HASH)
    }
}

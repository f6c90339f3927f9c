//! Payment gateway: checkout sessions and webhook verification.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto::verify_hmac_sha256_hex;

/// Maximum age of a webhook signature timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Error type for payment provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingError {
    message: String,
}

impl BillingError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BillingError {}

/// One-time payment or recurring subscription.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment.
    Payment,
    /// Recurring subscription.
    Subscription,
}

impl CheckoutMode {
    /// Provider label.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Priced checkout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Product name shown at checkout.
    pub name: String,
    /// Unit price in cents.
    pub amount_cents: i64,
    /// Quantity.
    pub quantity: u32,
    /// Billing interval for subscriptions.
    pub recurring_interval: Option<String>,
}

/// Checkout session to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Payment mode.
    pub mode: CheckoutMode,
    /// ISO currency code.
    pub currency: String,
    /// Lines to charge.
    pub line_items: Vec<LineItem>,
    /// Redirect after payment.
    pub success_url: String,
    /// Redirect after cancellation.
    pub cancel_url: String,
    /// Prefilled customer email.
    pub customer_email: Option<String>,
    /// Metadata echoed back in webhooks.
    pub metadata: BTreeMap<String, String>,
}

/// Created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Provider session id.
    pub session_id: String,
    /// Hosted checkout page.
    pub checkout_url: String,
}

/// Creates hosted checkout sessions.
pub trait PaymentGateway {
    /// Create a checkout session.
    fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, BillingError>;
}

/// Payment provider settings.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key.
    pub secret_key: String,
    /// Webhook signing secret.
    pub webhook_secret: String,
    /// API base URL.
    pub api_url: String,
}

impl StripeConfig {
    /// Build provider settings from `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET` and `STRIPE_API_URL`.
    pub fn from_env() -> Self {
        Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            api_url: std::env::var("STRIPE_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
        }
    }
}

/// Stripe Checkout client.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    /// Build a gateway from provider settings.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

impl PaymentGateway for StripeGateway {
    fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, BillingError> {
        if self.config.secret_key.is_empty() {
            return Err(BillingError::new("STRIPE_SECRET_KEY is required"));
        }
        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(encode_form(&checkout_form(request)))
            .send()
            .map_err(|err| BillingError::new(format!("stripe request failed: {err}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(BillingError::new(format!(
                "stripe api error ({status}): {body}"
            )));
        }
        let session: StripeSessionResponse = response
            .json()
            .map_err(|err| BillingError::new(format!("stripe response decode failed: {err}")))?;
        let checkout_url = session
            .url
            .ok_or_else(|| BillingError::new("stripe response missing url"))?;
        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
        })
    }
}

/// Flatten a checkout request into provider form fields.
pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut fields = vec![
        ("mode".to_string(), request.mode.as_str().to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    if let Some(email) = &request.customer_email {
        fields.push(("customer_email".to_string(), email.clone()));
    }
    for (index, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{index}]");
        fields.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        fields.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        fields.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.amount_cents.to_string(),
        ));
        if let Some(interval) = &item.recurring_interval {
            fields.push((
                format!("{prefix}[price_data][recurring][interval]"),
                interval.clone(),
            ));
        }
        fields.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }
    for (key, value) in &request.metadata {
        fields.push((format!("metadata[{key}]"), value.clone()));
        if request.mode == CheckoutMode::Subscription {
            fields.push((format!("subscription_data[metadata][{key}]"), value.clone()));
        }
    }
    fields
}

fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// In-process gateway returning predictable sessions.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    counter: AtomicU64,
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl MockPaymentGateway {
    /// Requests received so far.
    #[cfg(test)]
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, BillingError> {
        if request.line_items.is_empty() {
            return Err(BillingError::new("checkout requires at least one line item"));
        }
        let number = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let session_id = format!("cs_mock_{number}");
        let separator = if request.success_url.contains('?') {
            '&'
        } else {
            '?'
        };
        Ok(CheckoutSession {
            checkout_url: format!("{}{separator}session_id={session_id}", request.success_url),
            session_id,
        })
    }
}

/// Payment gateway plus webhook secret shared by handlers.
#[derive(Clone)]
pub struct Payments {
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    webhook_secret: String,
}

impl Payments {
    /// Build payments backed by a fresh mock gateway.
    pub fn mock(webhook_secret: &str) -> Self {
        Self::with_gateway(Arc::new(MockPaymentGateway::default()), webhook_secret)
    }

    /// Build payments around an explicit gateway.
    pub fn with_gateway(
        gateway: Arc<dyn PaymentGateway + Send + Sync>,
        webhook_secret: &str,
    ) -> Self {
        Self {
            gateway,
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Build payments from the environment; `TOOLYARD_PAYMENTS_MODE=mock` selects the mock gateway.
    #[cfg_attr(test, allow(dead_code))]
    pub fn from_env() -> Self {
        let config = StripeConfig::from_env();
        let mode = std::env::var("TOOLYARD_PAYMENTS_MODE").unwrap_or_else(|_| "live".to_string());
        if mode.eq_ignore_ascii_case("mock") {
            log::warn!("payments running in mock mode; no charges will be made");
            return Self::mock(&config.webhook_secret);
        }
        let webhook_secret = config.webhook_secret.clone();
        Self::with_gateway(Arc::new(StripeGateway::new(config)), &webhook_secret)
    }

    /// Create a checkout session.
    pub fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.gateway.create_checkout(request)
    }

    /// Verify a webhook signature header at unix time `now`.
    pub fn verify_webhook(
        &self,
        header: &str,
        payload: &[u8],
        now: i64,
    ) -> Result<(), BillingError> {
        verify_signature(header, payload, &self.webhook_secret, now)
    }
}

/// Verify a `t=…,v1=…` signature header.
///
/// The signed message is `"{t}.{payload}"`; any `v1` entry may match.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
) -> Result<(), BillingError> {
    if secret.is_empty() {
        return Err(BillingError::new("webhook secret is not configured"));
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp =
        timestamp.ok_or_else(|| BillingError::new("signature header missing timestamp"))?;
    if signatures.is_empty() {
        return Err(BillingError::new("signature header missing v1 signature"));
    }
    let skew = now.checked_sub(timestamp).map(i64::unsigned_abs);
    if !skew.is_some_and(|skew| skew <= SIGNATURE_TOLERANCE_SECS.unsigned_abs()) {
        return Err(BillingError::new("signature timestamp outside tolerance"));
    }
    let mut message = format!("{timestamp}.").into_bytes();
    message.extend_from_slice(payload);
    if signatures
        .iter()
        .any(|signature| verify_hmac_sha256_hex(secret.as_bytes(), &message, signature))
    {
        Ok(())
    } else {
        Err(BillingError::new("signature mismatch"))
    }
}

/// Webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event id.
    pub id: String,
    /// Event type such as `checkout.session.completed`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event payload.
    pub data: WebhookData,
}

/// Webhook payload wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    /// Object the event is about.
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Object id.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|value| value.as_str())
    }

    /// Metadata entry of the object.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.data
            .object
            .get("metadata")
            .and_then(|metadata| metadata.get(key))
            .and_then(|value| value.as_str())
    }

    /// String field of the object.
    pub fn object_str(&self, key: &str) -> Option<&str> {
        self.data.object.get(key).and_then(|value| value.as_str())
    }
}

#[cfg(test)]
pub(crate) fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut message = format!("{timestamp}.").into_bytes();
    message.extend_from_slice(payload);
    let signature = crate::crypto::hmac_sha256_hex(secret.as_bytes(), &message);
    format!("t={timestamp},v1={signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{env_lock, swap_env};
    use httpmock::Method::POST;
    use httpmock::MockServer;

    fn sample_request(mode: CheckoutMode) -> CheckoutRequest {
        let mut metadata = BTreeMap::new();
        metadata.insert("kind".to_string(), "listing".to_string());
        metadata.insert("tool_id".to_string(), "tool-1".to_string());
        CheckoutRequest {
            mode,
            currency: "usd".to_string(),
            line_items: vec![LineItem {
                name: "Featured listing".to_string(),
                amount_cents: 19700,
                quantity: 1,
                recurring_interval: (mode == CheckoutMode::Subscription)
                    .then(|| "month".to_string()),
            }],
            success_url: "https://toolyard.example/thanks".to_string(),
            cancel_url: "https://toolyard.example/submit".to_string(),
            customer_email: Some("ada@example.com".to_string()),
            metadata,
        }
    }

    #[test]
    fn checkout_form_encodes_lines_and_metadata() {
        let fields = checkout_form(&sample_request(CheckoutMode::Subscription));
        let get = |key: &str| {
            fields
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Featured listing")
        );
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("19700"));
        assert_eq!(
            get("line_items[0][price_data][recurring][interval]"),
            Some("month")
        );
        assert_eq!(get("metadata[tool_id]"), Some("tool-1"));
        assert_eq!(get("subscription_data[metadata][tool_id]"), Some("tool-1"));
        assert_eq!(get("customer_email"), Some("ada@example.com"));

        let payment = checkout_form(&sample_request(CheckoutMode::Payment));
        assert!(
            payment
                .iter()
                .all(|(name, _)| !name.starts_with("subscription_data"))
        );
    }

    #[test]
    fn encode_form_escapes_brackets_and_spaces() {
        let body = encode_form(&[(
            "line_items[0][price_data][product_data][name]".to_string(),
            "Banner ad (2026-01-01 – 2026-01-07)".to_string(),
        )]);
        assert!(body.starts_with("line_items%5B0%5D"));
        assert!(body.contains("Banner%20ad"));
    }

    #[test]
    fn stripe_gateway_creates_session() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/checkout/sessions")
                .header("authorization", "Bearer sk_test_123")
                .body_contains("mode=payment")
                .body_contains("metadata%5Bkind%5D=listing");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "id": "cs_test_1",
                    "url": "https://checkout.stripe.com/c/pay/cs_test_1"
                }));
        });
        let gateway = StripeGateway::new(StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: String::new(),
            api_url: server.url(""),
        });
        let session = gateway
            .create_checkout(&sample_request(CheckoutMode::Payment))
            .expect("session");
        mock.assert();
        assert_eq!(session.session_id, "cs_test_1");
        assert!(session.checkout_url.contains("cs_test_1"));
    }

    #[test]
    fn stripe_gateway_reports_api_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/checkout/sessions");
            then.status(402).body("card_declined");
        });
        let gateway = StripeGateway::new(StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: String::new(),
            api_url: server.url(""),
        });
        let err = gateway
            .create_checkout(&sample_request(CheckoutMode::Payment))
            .unwrap_err();
        mock.assert();
        assert!(err.to_string().contains("stripe api error"));
        assert!(err.to_string().contains("card_declined"));
    }

    #[test]
    fn stripe_gateway_requires_secret_key() {
        let gateway = StripeGateway::new(StripeConfig {
            secret_key: String::new(),
            webhook_secret: String::new(),
            api_url: "http://127.0.0.1:9".to_string(),
        });
        let err = gateway
            .create_checkout(&sample_request(CheckoutMode::Payment))
            .unwrap_err();
        assert!(err.to_string().contains("STRIPE_SECRET_KEY"));
    }

    #[test]
    fn mock_gateway_numbers_sessions() {
        let gateway = MockPaymentGateway::default();
        let first = gateway
            .create_checkout(&sample_request(CheckoutMode::Payment))
            .expect("first");
        let second = gateway
            .create_checkout(&sample_request(CheckoutMode::Payment))
            .expect("second");
        assert_eq!(first.session_id, "cs_mock_1");
        assert_eq!(second.session_id, "cs_mock_2");
        assert_eq!(
            first.checkout_url,
            "https://toolyard.example/thanks?session_id=cs_mock_1"
        );
        assert_eq!(gateway.requests().len(), 2);
    }

    #[test]
    fn verify_signature_accepts_valid_header() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign_payload("whsec_test", payload, 1_700_000_000);
        verify_signature(&header, payload, "whsec_test", 1_700_000_100).expect("valid");
        let rotated = format!("{header},v1=deadbeef");
        verify_signature(&rotated, payload, "whsec_test", 1_700_000_000).expect("valid");
    }

    #[test]
    fn verify_signature_rejects_bad_headers() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign_payload("whsec_test", payload, 1_700_000_000);
        let stale = verify_signature(&header, payload, "whsec_test", 1_700_000_301).unwrap_err();
        assert!(stale.to_string().contains("tolerance"));
        let wrong = verify_signature(&header, payload, "whsec_other", 1_700_000_000).unwrap_err();
        assert!(wrong.to_string().contains("mismatch"));
        assert!(verify_signature("v1=abc", payload, "whsec_test", 0).is_err());
        assert!(verify_signature("t=1", payload, "whsec_test", 1).is_err());
        assert!(verify_signature(&header, payload, "", 1_700_000_000).is_err());
    }

    #[test]
    fn verify_signature_rejects_extreme_timestamps() {
        let payload = br#"{"id":"evt_1"}"#;
        for (timestamp, now) in [
            (i64::MIN, 1_700_000_000),
            (i64::MAX, 1_700_000_000),
            (i64::MAX, i64::MIN),
            (i64::MIN, i64::MAX),
        ] {
            let header = sign_payload("whsec_test", payload, timestamp);
            let err = verify_signature(&header, payload, "whsec_test", now).unwrap_err();
            assert!(err.to_string().contains("tolerance"), "{header}");
        }
        let edge = sign_payload("whsec_test", payload, i64::MAX);
        verify_signature(&edge, payload, "whsec_test", i64::MAX - 300).expect("within tolerance");

        for header in [
            "t=abc,v1=00",
            "t=,v1=00",
            "t=99999999999999999999,v1=00",
            "t=-9223372036854775809,v1=00",
        ] {
            let err = verify_signature(header, payload, "whsec_test", 0).unwrap_err();
            assert!(err.to_string().contains("missing timestamp"), "{header}");
        }
    }

    #[test]
    fn webhook_event_exposes_metadata() {
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "subscription": "sub_1", "metadata": {"kind": "ads"}}}
        }))
        .expect("event");
        assert_eq!(event.kind, "checkout.session.completed");
        assert_eq!(event.object_id(), Some("cs_1"));
        assert_eq!(event.metadata("kind"), Some("ads"));
        assert_eq!(event.metadata("missing"), None);
        assert_eq!(event.object_str("subscription"), Some("sub_1"));
    }

    #[test]
    fn from_env_selects_mock_mode() {
        let _guard = env_lock();
        let mode = swap_env("TOOLYARD_PAYMENTS_MODE", Some("mock"));
        let secret = swap_env("STRIPE_WEBHOOK_SECRET", Some("whsec_env"));
        let payments = Payments::from_env();
        let session = payments
            .create_checkout(&sample_request(CheckoutMode::Payment))
            .expect("mock session");
        assert!(session.session_id.starts_with("cs_mock_"));
        let payload = b"{}";
        let header = sign_payload("whsec_env", payload, 10);
        payments.verify_webhook(&header, payload, 10).expect("verified");
        swap_env("TOOLYARD_PAYMENTS_MODE", mode.as_deref());
        swap_env("STRIPE_WEBHOOK_SECRET", secret.as_deref());
    }
}

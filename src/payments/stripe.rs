//! Stripe integration: webhook signature verification, event payload
//! models, and customer lookup over the REST API.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::error::{msg, AppError, Result};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum accepted age of a signed payload, in seconds. Mirrors the
/// default tolerance of Stripe's own SDKs.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Small allowance for clock skew when the signature timestamp is ahead
/// of our clock.
const FUTURE_SKEW_SECS: i64 = 60;

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            webhook_secret,
        }
    }

    /// Verify a `Stripe-Signature` header against the raw request body.
    ///
    /// The header is a comma-separated list of `k=v` pairs; we need the
    /// `t` timestamp and at least one `v1` signature. The expected
    /// signature is HMAC-SHA256 over `"{t}.{body}"` keyed by the webhook
    /// secret, and comparison is constant-time.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = Some(v),
                Some(("v1", v)) => signatures.push(v),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.to_string())
        })?;
        if signatures.is_empty() {
            return Err(AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.to_string()));
        }

        let ts: i64 = timestamp.parse().map_err(|_| {
            AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.to_string())
        })?;

        let age = chrono::Utc::now().timestamp() - ts;
        if age > SIGNATURE_TOLERANCE_SECS || age < -FUTURE_SKEW_SECS {
            tracing::warn!(age, "webhook signature timestamp outside tolerance");
            return Err(AppError::Unauthorized);
        }

        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let valid = signatures
            .iter()
            .any(|sig| sig.as_bytes().ct_eq(expected.as_bytes()).into());
        if !valid {
            return Err(AppError::Unauthorized);
        }

        Ok(())
    }

    /// Fetch a customer record, used to fill in an email when the event
    /// payload itself carries none.
    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer> {
        let resp = self
            .client
            .get(format!("{STRIPE_API_BASE}/customers/{customer_id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe customer lookup failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Internal(format!(
                "Stripe customer lookup returned {}",
                resp.status()
            )));
        }

        resp.json::<StripeCustomer>()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe customer response invalid: {e}")))
    }
}

// ============ Webhook payload models ============
//
// Deliberately partial: only the fields the ledger consumes. Everything
// else rides along in the raw metadata we store per conversion.

#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    /// Event id ("evt_..."), the idempotency key for ingestion
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    /// Either a customer id string or an expanded customer object
    #[serde(default)]
    pub customer: Option<serde_json::Value>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl StripeCheckoutSession {
    /// Customer id regardless of whether the field came expanded.
    pub fn customer_id(&self) -> Option<&str> {
        match self.customer.as_ref()? {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Object(obj) => obj.get("id")?.as_str(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Free-form address object, recorded into conversion metadata as-is
    #[serde(default)]
    pub address: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    #[serde(default)]
    pub customer: Option<serde_json::Value>,
    #[serde(default)]
    pub items: Option<StripeSubscriptionItems>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl StripeSubscription {
    pub fn customer_id(&self) -> Option<&str> {
        match self.customer.as_ref()? {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Object(obj) => obj.get("id")?.as_str(),
            _ => None,
        }
    }

    /// Total recurring amount: the sum of the unit prices of all items.
    pub fn total_amount_cents(&self) -> i64 {
        self.items
            .as_ref()
            .map(|items| {
                items
                    .data
                    .iter()
                    .filter_map(|item| item.price.as_ref()?.unit_amount)
                    .sum()
            })
            .unwrap_or(0)
    }

    fn first_price(&self) -> Option<&StripePrice> {
        self.items.as_ref()?.data.first()?.price.as_ref()
    }

    /// Price id of the primary plan.
    pub fn plan_id(&self) -> Option<&str> {
        self.first_price()?.id.as_deref()
    }

    /// Display name of the primary plan, when the price carries one.
    pub fn plan_name(&self) -> Option<&str> {
        self.first_price()?.nickname.as_deref()
    }

    /// Billing interval of the primary plan ("month", "year", ...).
    pub fn billing_interval(&self) -> Option<&str> {
        self.first_price()?.recurring.as_ref()?.interval.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    #[serde(default)]
    pub price: Option<StripePrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRecurring {
    #[serde(default)]
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub deleted: Option<bool>,
}

// ============ Test helpers ============

/// Build a `Stripe-Signature` header value for a payload, the way
/// Stripe's CLI does when replaying events. Used by the test suite.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

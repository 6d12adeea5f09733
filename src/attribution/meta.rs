//! Meta Conversions API client.
//!
//! Sends server-side purchase events with hashed customer identifiers.
//! Raw PII never leaves this module: email and phone are normalized and
//! SHA-256 hashed before the payload is built.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

/// Where to deliver an attribution event: a pixel plus its access token.
#[derive(Debug, Clone)]
pub struct Destination {
    pub pixel_id: String,
    pub access_token: String,
}

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Normalize and hash a PII field the way the Conversions API expects:
/// trim, lowercase, SHA-256, lowercase hex.
pub fn hash_pii(value: &str) -> String {
    let normalized = value.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Render a minor-unit amount as a decimal string ("1050" -> "10.50").
/// Integer math, no floats.
pub fn minor_to_decimal(amount_cents: i64) -> String {
    format!("{}.{:02}", amount_cents / 100, amount_cents % 100)
}

/// Everything needed to build one conversion event payload.
#[derive(Debug, Clone, Default)]
pub struct AttributionData {
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub amount_cents: i64,
    /// Lowercase ISO code as stored; uppercased on the wire
    pub currency: String,
    /// Deduplication id forwarded as the CAPI event_id
    pub event_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// When set, the send lands in the pixel's Test Events view
    pub test_event_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    em: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ph: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
struct CustomData {
    value: String,
    currency: String,
    content_type: &'static str,
    content_ids: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ConversionEvent {
    event_name: &'static str,
    event_time: i64,
    event_id: String,
    action_source: &'static str,
    user_data: UserData,
    custom_data: CustomData,
}

#[derive(Debug, Serialize)]
struct EventRequest {
    data: Vec<ConversionEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_event_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetaResponse {
    #[serde(default)]
    pub events_received: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

#[derive(Clone)]
pub struct MetaClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetaClient {
    pub fn new() -> Self {
        Self::with_base_url(GRAPH_API_BASE.to_string())
    }

    /// Point the client at a different Graph API host. The test suite
    /// uses this to capture sends against a local sink.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn build_request(data: &AttributionData) -> EventRequest {
        EventRequest {
            data: vec![ConversionEvent {
                event_name: "Purchase",
                event_time: chrono::Utc::now().timestamp(),
                event_id: data.event_id.clone(),
                action_source: "website",
                user_data: UserData {
                    em: data.customer_email.as_deref().map(|e| vec![hash_pii(e)]),
                    ph: data.customer_phone.as_deref().map(|p| vec![hash_pii(p)]),
                    client_ip_address: data.ip_address.clone(),
                    client_user_agent: data.user_agent.clone(),
                },
                custom_data: CustomData {
                    value: minor_to_decimal(data.amount_cents),
                    currency: data.currency.to_uppercase(),
                    content_type: "product",
                    content_ids: vec!["stripe_purchase"],
                },
            }],
            test_event_code: data.test_event_code.clone(),
        }
    }

    /// Deliver one conversion event to one destination.
    pub async fn send_event(
        &self,
        destination: &Destination,
        data: &AttributionData,
    ) -> Result<MetaResponse, AttributionError> {
        let url = format!(
            "{}/{}/events?access_token={}",
            self.base_url, destination.pixel_id, destination.access_token
        );
        let request = Self::build_request(data);

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AttributionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<MetaResponse>().await?)
    }
}

impl Default for MetaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_normalized_pii() {
        // sha256("test@example.com")
        assert_eq!(
            hash_pii("  Test@Example.COM "),
            "973dfe463ec85785f5f95af5ba3906eedb2d931c24e69824a89ea65dba4e813b"
        );
        assert_eq!(hash_pii("test@example.com"), hash_pii("TEST@EXAMPLE.COM"));
    }

    #[test]
    fn formats_minor_units_as_decimal() {
        assert_eq!(minor_to_decimal(0), "0.00");
        assert_eq!(minor_to_decimal(5), "0.05");
        assert_eq!(minor_to_decimal(100), "1.00");
        assert_eq!(minor_to_decimal(1050), "10.50");
        assert_eq!(minor_to_decimal(100000), "1000.00");
    }

    #[test]
    fn builds_payload_with_hashed_identifiers() {
        let data = AttributionData {
            customer_email: Some("buyer@example.com".into()),
            customer_phone: None,
            amount_cents: 250000,
            currency: "jpy".into(),
            event_id: "evt_42".into(),
            ip_address: Some("203.0.113.9".into()),
            user_agent: Some("test-agent".into()),
            test_event_code: None,
        };
        let body = serde_json::to_value(MetaClient::build_request(&data)).unwrap();

        let event = &body["data"][0];
        assert_eq!(event["event_name"], "Purchase");
        assert_eq!(event["action_source"], "website");
        assert_eq!(event["event_id"], "evt_42");
        assert_eq!(event["user_data"]["em"][0], hash_pii("buyer@example.com"));
        assert!(event["user_data"].get("ph").is_none());
        assert_eq!(event["custom_data"]["value"], "2500.00");
        assert_eq!(event["custom_data"]["currency"], "JPY");
        assert_eq!(event["custom_data"]["content_ids"][0], "stripe_purchase");
        // Raw email must not appear anywhere in the serialized payload
        assert!(!body.to_string().contains("buyer@example.com"));
        assert!(body.get("test_event_code").is_none());
    }

    #[test]
    fn test_event_code_rides_at_request_root() {
        let data = AttributionData {
            test_event_code: Some("TEST123".into()),
            event_id: "evt_1".into(),
            currency: "usd".into(),
            ..Default::default()
        };
        let body = serde_json::to_value(MetaClient::build_request(&data)).unwrap();
        assert_eq!(body["test_event_code"], "TEST123");
    }
}

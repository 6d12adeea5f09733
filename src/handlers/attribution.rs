//! Manual test-fire endpoint for attribution destinations.
//!
//! Lets an operator verify pixel credentials end to end without waiting
//! for a real payment. Always answers 200 with per-destination results;
//! delivery failures are data, not errors.

use axum::{extract::State, http::HeaderMap, response::IntoResponse, routing::post, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::attribution::{fanout, AttributionData};
use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/test-conversion", post(test_conversion))
}

const DEFAULT_TEST_EMAIL: &str = "test@example.com";
const DEFAULT_TEST_PHONE: &str = "+81-90-1234-5678";
const DEFAULT_TEST_AMOUNT_CENTS: i64 = 1000;
const DEFAULT_TEST_CURRENCY: &str = "jpy";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestConversionRequest {
    /// Single campaign to target
    campaign_id: Option<String>,
    /// Several campaigns to target concurrently
    #[serde(default)]
    campaign_ids: Vec<String>,
    email: Option<String>,
    phone: Option<String>,
    amount_cents: Option<i64>,
    currency: Option<String>,
    test_event_code: Option<String>,
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn test_conversion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TestConversionRequest>,
) -> Result<impl IntoResponse> {
    let data = AttributionData {
        customer_email: Some(
            body.email
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_TEST_EMAIL.to_string()),
        ),
        customer_phone: Some(
            body.phone
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_TEST_PHONE.to_string()),
        ),
        amount_cents: body.amount_cents.unwrap_or(DEFAULT_TEST_AMOUNT_CENTS),
        currency: body
            .currency
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_TEST_CURRENCY.to_string())
            .to_lowercase(),
        // Fresh id per call so repeated test fires are never deduplicated
        event_id: format!("test_{}", Uuid::new_v4()),
        ip_address: client_ip(&headers),
        user_agent: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        test_event_code: body.test_event_code,
    };

    let results = if !body.campaign_ids.is_empty() {
        fanout::send_to_campaigns(&state, &body.campaign_ids, &data).await
    } else if let Some(campaign_id) = body.campaign_id.filter(|s| !s.is_empty()) {
        vec![fanout::send_for_campaign(&state, &campaign_id, &data).await]
    } else {
        vec![fanout::send_default(&state, &data).await]
    };

    Ok(Json(json!({
        "eventId": data.event_id,
        "results": results,
    })))
}

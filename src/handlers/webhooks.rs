//! Payment webhook ingestion endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde_json::json;

use crate::attribution::spawn_post_ingest;
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::ingest::{self, IngestOutcome};
use crate::payments::stripe::StripeWebhookEvent;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/stripe-webhook", post(stripe_webhook))
}

/// Handle a webhook delivery.
///
/// Signature verification runs over the raw body bytes, before any JSON
/// parsing. Attribution fan-out happens on a detached task after the
/// conversion is recorded, so the acknowledgment never waits on it.
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".to_string()))?;

    state.stripe.verify_webhook_signature(&body, signature)?;

    let event: StripeWebhookEvent = serde_json::from_slice(&body)?;
    let event = ingest::parse_event(event)?;

    match ingest::ingest_event(&state, event).await? {
        IngestOutcome::Recorded {
            conversion,
            campaign_id,
        } => {
            let conversion_id = conversion.id.clone();
            spawn_post_ingest(state, conversion, campaign_id);
            Ok(Json(json!({
                "status": "success",
                "conversionId": conversion_id,
            })))
        }
        IngestOutcome::AlreadyProcessed => Ok(Json(json!({ "status": "already_processed" }))),
        IngestOutcome::Ignored => Ok(Json(json!({ "status": "ignored" }))),
    }
}

//! Attribution fan-out: route a recorded conversion to the Meta pixel
//! of its campaign (or the default pixel) without ever blocking or
//! failing the webhook response.

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;

use crate::db::{queries, AppState};
use crate::models::Conversion;

use super::meta::{AttributionData, Destination};

/// Per-destination result of a fan-out send. One destination failing
/// never affects the others.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn resolve_destination(state: &AppState, campaign_id: &str) -> Option<Destination> {
    let conn = match state.db.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("fan-out: pool unavailable: {}", e);
            return None;
        }
    };
    match queries::get_active_mapping(&conn, campaign_id) {
        Ok(Some(mapping)) => Some(mapping.destination()),
        Ok(None) => {
            tracing::debug!(campaign_id, "no active mapping, trying default destination");
            state.default_destination.clone()
        }
        Err(e) => {
            tracing::error!(campaign_id, "fan-out: mapping lookup failed: {}", e);
            None
        }
    }
}

/// Send one event for one campaign, resolving its destination first.
pub async fn send_for_campaign(
    state: &AppState,
    campaign_id: &str,
    data: &AttributionData,
) -> SendOutcome {
    let Some(destination) = resolve_destination(state, campaign_id) else {
        return SendOutcome {
            campaign_id: Some(campaign_id.to_string()),
            success: false,
            error: Some("no destination configured".to_string()),
        };
    };

    match state.meta.send_event(&destination, data).await {
        Ok(resp) => {
            tracing::info!(
                campaign_id,
                events_received = resp.events_received,
                "attribution event delivered"
            );
            SendOutcome {
                campaign_id: Some(campaign_id.to_string()),
                success: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(campaign_id, "attribution send failed: {}", e);
            SendOutcome {
                campaign_id: Some(campaign_id.to_string()),
                success: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Send the same event to several campaigns concurrently. All sends run
/// to completion; failures are reported per campaign, never propagated.
pub async fn send_to_campaigns(
    state: &AppState,
    campaign_ids: &[String],
    data: &AttributionData,
) -> Vec<SendOutcome> {
    join_all(
        campaign_ids
            .iter()
            .map(|id| send_for_campaign(state, id, data)),
    )
    .await
}

/// Send straight to the default destination, bypassing campaign lookup.
pub async fn send_default(state: &AppState, data: &AttributionData) -> SendOutcome {
    let Some(destination) = state.default_destination.clone() else {
        return SendOutcome {
            campaign_id: None,
            success: false,
            error: Some("no default destination configured".to_string()),
        };
    };

    match state.meta.send_event(&destination, data).await {
        Ok(_) => SendOutcome {
            campaign_id: None,
            success: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!("default attribution send failed: {}", e);
            SendOutcome {
                campaign_id: None,
                success: false,
                error: Some(e.to_string()),
            }
        }
    }
}

fn attribution_data_for(conversion: &Conversion) -> AttributionData {
    AttributionData {
        customer_email: Some(conversion.customer_email.clone()),
        customer_phone: None,
        amount_cents: conversion.amount_cents,
        currency: conversion.currency.clone(),
        event_id: conversion.source_event_id.clone(),
        ip_address: None,
        user_agent: None,
        test_event_code: None,
    }
}

/// Fire-and-forget attribution after a conversion is recorded.
///
/// Runs on a detached task so webhook acknowledgment never waits on the
/// Conversions API. A panic in the send path is caught and logged; it
/// must not take down the server or poison the runtime.
pub fn spawn_post_ingest(state: AppState, conversion: Conversion, campaign_id: Option<String>) {
    tokio::spawn(async move {
        let result = AssertUnwindSafe(async {
            let data = attribution_data_for(&conversion);
            let outcome = match campaign_id.as_deref() {
                Some(id) => send_for_campaign(&state, id, &data).await,
                None => send_default(&state, &data).await,
            };
            if !outcome.success {
                tracing::warn!(
                    source_event_id = %conversion.source_event_id,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "post-ingest attribution did not deliver"
                );
            }
        })
        .catch_unwind()
        .await;

        if result.is_err() {
            tracing::error!(
                source_event_id = %conversion.source_event_id,
                "post-ingest attribution task panicked"
            );
        }
    });
}

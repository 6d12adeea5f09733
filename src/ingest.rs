//! Webhook event interpretation: classify an incoming payment event,
//! extract conversion fields, and record them idempotently.

use serde_json::json;

use crate::db::queries::{self, ConversionInsert};
use crate::db::AppState;
use crate::error::Result;
use crate::models::{Conversion, CreateConversion};
use crate::payments::stripe::{StripeCheckoutSession, StripeSubscription, StripeWebhookEvent};

/// Sentinel recorded when an event carries no resolvable customer email.
pub const UNKNOWN_EMAIL: &str = "unknown@example.com";

const DEFAULT_CURRENCY: &str = "jpy";
const DEFAULT_STATUS: &str = "completed";

/// A webhook event after classification.
#[derive(Debug)]
pub enum PaymentEvent {
    CheckoutCompleted {
        event_id: String,
        session: Box<StripeCheckoutSession>,
    },
    SubscriptionCreated {
        event_id: String,
        subscription: Box<StripeSubscription>,
    },
    /// Any event type the ledger does not track
    Ignored { event_type: String },
}

/// Result of ingesting one event.
#[derive(Debug)]
pub enum IngestOutcome {
    Recorded {
        conversion: Conversion,
        campaign_id: Option<String>,
    },
    /// Redelivery of an event already in the ledger
    AlreadyProcessed,
    Ignored,
}

/// Classify a parsed webhook event. Payload shapes that do not match the
/// expected object for their type surface as deserialization errors.
pub fn parse_event(event: StripeWebhookEvent) -> Result<PaymentEvent> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSession = serde_json::from_value(event.data.object)?;
            Ok(PaymentEvent::CheckoutCompleted {
                event_id: event.id,
                session: Box::new(session),
            })
        }
        "customer.subscription.created" => {
            let subscription: StripeSubscription = serde_json::from_value(event.data.object)?;
            Ok(PaymentEvent::SubscriptionCreated {
                event_id: event.id,
                subscription: Box::new(subscription),
            })
        }
        _ => Ok(PaymentEvent::Ignored {
            event_type: event.event_type,
        }),
    }
}

fn campaign_id_from_metadata(metadata: Option<&serde_json::Value>) -> Option<String> {
    metadata?
        .get("campaign_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Resolve an email for a checkout session, falling back to a customer
/// lookup and finally to the sentinel. An absent email is fine; a failed
/// lookup is a server error so the source redelivers the event.
async fn resolve_checkout_email(
    state: &AppState,
    session: &StripeCheckoutSession,
) -> Result<String> {
    if let Some(email) = session
        .customer_details
        .as_ref()
        .and_then(|d| d.email.as_deref())
        .filter(|e| !e.is_empty())
    {
        return Ok(email.to_string());
    }

    lookup_customer_email(state, session.customer_id()).await
}

async fn lookup_customer_email(state: &AppState, customer_id: Option<&str>) -> Result<String> {
    let Some(customer_id) = customer_id else {
        return Ok(UNKNOWN_EMAIL.to_string());
    };

    let customer = state.stripe.retrieve_customer(customer_id).await?;
    Ok(customer
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| UNKNOWN_EMAIL.to_string()))
}

/// Record a classified event in the ledger.
///
/// Idempotency rests on the UNIQUE constraint over the source event id:
/// redelivered events come back as `AlreadyProcessed` even when two
/// deliveries race.
pub async fn ingest_event(state: &AppState, event: PaymentEvent) -> Result<IngestOutcome> {
    let (input, campaign_id) = match event {
        PaymentEvent::Ignored { event_type } => {
            tracing::debug!(%event_type, "ignoring untracked event type");
            return Ok(IngestOutcome::Ignored);
        }
        PaymentEvent::CheckoutCompleted { event_id, session } => {
            let email = resolve_checkout_email(state, &session).await?;
            let campaign_id = campaign_id_from_metadata(session.metadata.as_ref());
            let status = session
                .payment_status
                .clone()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string());
            let metadata = json!({
                "sessionId": &session.id,
                "customerId": session.customer_id(),
                "paymentStatus": &status,
                "customerDetails": &session.customer_details,
                "campaignId": &campaign_id,
            });
            (
                CreateConversion {
                    source_event_id: event_id,
                    customer_email: email,
                    amount_cents: session.amount_total.unwrap_or(0),
                    currency: session
                        .currency
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
                        .to_lowercase(),
                    status,
                    metadata,
                },
                campaign_id,
            )
        }
        PaymentEvent::SubscriptionCreated {
            event_id,
            subscription,
        } => {
            let email = lookup_customer_email(state, subscription.customer_id()).await?;
            let campaign_id = campaign_id_from_metadata(subscription.metadata.as_ref());
            let status = subscription
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string());
            let metadata = json!({
                "subscriptionId": &subscription.id,
                "customerId": subscription.customer_id(),
                "subscriptionStatus": &status,
                "planId": subscription.plan_id(),
                "planName": subscription.plan_name(),
                "interval": subscription.billing_interval(),
                "currentPeriodStart": subscription.current_period_start,
                "currentPeriodEnd": subscription.current_period_end,
                "trialEnd": subscription.trial_end,
                "cancelAtPeriodEnd": subscription.cancel_at_period_end,
                "campaignId": &campaign_id,
            });
            (
                CreateConversion {
                    source_event_id: event_id,
                    customer_email: email,
                    amount_cents: subscription.total_amount_cents(),
                    currency: subscription
                        .currency
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
                        .to_lowercase(),
                    status,
                    metadata,
                },
                campaign_id,
            )
        }
    };

    let conn = state.db.get()?;
    match queries::insert_conversion(&conn, &input)? {
        ConversionInsert::Inserted(conversion) => {
            tracing::info!(
                source_event_id = %conversion.source_event_id,
                amount_cents = conversion.amount_cents,
                "conversion recorded"
            );
            Ok(IngestOutcome::Recorded {
                conversion,
                campaign_id,
            })
        }
        ConversionInsert::DuplicateEvent => {
            tracing::info!(
                source_event_id = %input.source_event_id,
                "duplicate event delivery, already recorded"
            );
            Ok(IngestOutcome::AlreadyProcessed)
        }
    }
}

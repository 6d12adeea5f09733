use serde::{Deserialize, Serialize};

/// A recorded monetary conversion, one row per upstream payment event.
///
/// `source_event_id` is the idempotency key: redelivery of the same
/// webhook event never creates a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub id: String,
    /// Unique identifier of the originating payment event (e.g. "evt_...")
    pub source_event_id: String,
    /// Best-effort customer email; sentinel when the event carries none
    pub customer_email: String,
    /// Amount in minor currency units (cents); never negative
    pub amount_cents: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    /// Provider-supplied lifecycle tag, defaults to "completed"
    pub status: String,
    /// Schema-less provider context, stored as serialized JSON.
    /// Never interpreted by the ledger itself.
    pub metadata: String,
    /// Insert timestamp (unix seconds); the sole ordering key for reporting
    pub created_at: i64,
}

/// Data required to record a conversion.
#[derive(Debug, Clone)]
pub struct CreateConversion {
    pub source_event_id: String,
    pub customer_email: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub metadata: serde_json::Value,
}

/// Filters shared by the listing, summary, and export queries.
///
/// The same predicate must back all three so the summary is correct
/// regardless of the pagination window.
#[derive(Debug, Default, Clone)]
pub struct ConversionFilters {
    /// Case-insensitive email substring
    pub email: Option<String>,
    /// Inclusive creation-time lower bound (unix seconds)
    pub start: Option<i64>,
    /// Inclusive creation-time upper bound (unix seconds)
    pub end: Option<i64>,
}

/// Aggregate over the full filtered set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    /// Sum of amount_cents across all matching rows (0 for an empty set)
    pub total_amount: i64,
    pub total_conversions: i64,
}

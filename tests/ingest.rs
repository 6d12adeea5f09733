//! Ledger-level ingestion tests: idempotent inserts and event parsing

mod common;

use common::*;

use adledger::db::queries::ConversionInsert;
use adledger::ingest::{parse_event, PaymentEvent};
use adledger::payments::stripe::StripeWebhookEvent;

fn create_input(event_id: &str) -> CreateConversion {
    CreateConversion {
        source_event_id: event_id.to_string(),
        customer_email: "buyer@example.com".to_string(),
        amount_cents: 100000,
        currency: "jpy".to_string(),
        status: "paid".to_string(),
        metadata: serde_json::json!({ "sessionId": "cs_1" }),
    }
}

#[test]
fn test_first_insert_records_the_row() {
    let conn = setup_test_db();
    let outcome = queries::insert_conversion(&conn, &create_input("evt_1")).unwrap();
    let conversion = match outcome {
        ConversionInsert::Inserted(c) => c,
        other => panic!("expected Inserted, got {other:?}"),
    };
    assert_eq!(conversion.source_event_id, "evt_1");
    assert_eq!(conversion.amount_cents, 100000);
    assert_eq!(conversion.metadata, r#"{"sessionId":"cs_1"}"#);

    let fetched = queries::get_conversion_by_event_id(&conn, "evt_1")
        .unwrap()
        .expect("row missing");
    assert_eq!(fetched.id, conversion.id);
}

#[test]
fn test_duplicate_event_id_is_reported_not_errored() {
    let conn = setup_test_db();
    queries::insert_conversion(&conn, &create_input("evt_dup")).unwrap();

    // Same event id again, different payload: still one row
    let mut second = create_input("evt_dup");
    second.amount_cents = 999;
    let outcome = queries::insert_conversion(&conn, &second).unwrap();
    assert!(matches!(outcome, ConversionInsert::DuplicateEvent));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM conversions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);

    // The original row is untouched
    let row = queries::get_conversion_by_event_id(&conn, "evt_dup")
        .unwrap()
        .unwrap();
    assert_eq!(row.amount_cents, 100000);
}

#[test]
fn test_repeated_duplicate_inserts_never_leak() {
    let conn = setup_test_db();
    for _ in 0..10 {
        queries::insert_conversion(&conn, &create_input("evt_race")).unwrap();
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM conversions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_negative_amount_is_rejected_by_schema() {
    let conn = setup_test_db();
    let mut input = create_input("evt_neg");
    input.amount_cents = -5;
    // A CHECK violation is a real error, not a duplicate report
    assert!(queries::insert_conversion(&conn, &input).is_err());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM conversions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_parse_event_classifies_tracked_types() {
    let checkout: StripeWebhookEvent = serde_json::from_value(serde_json::json!({
        "id": "evt_c",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_1", "amount_total": 100 } }
    }))
    .unwrap();
    assert!(matches!(
        parse_event(checkout).unwrap(),
        PaymentEvent::CheckoutCompleted { .. }
    ));

    let subscription: StripeWebhookEvent = serde_json::from_value(serde_json::json!({
        "id": "evt_s",
        "type": "customer.subscription.created",
        "data": { "object": { "id": "sub_1" } }
    }))
    .unwrap();
    assert!(matches!(
        parse_event(subscription).unwrap(),
        PaymentEvent::SubscriptionCreated { .. }
    ));

    let other: StripeWebhookEvent = serde_json::from_value(serde_json::json!({
        "id": "evt_x",
        "type": "payment_intent.succeeded",
        "data": { "object": {} }
    }))
    .unwrap();
    assert!(matches!(
        parse_event(other).unwrap(),
        PaymentEvent::Ignored { .. }
    ));
}

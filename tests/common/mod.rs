//! Test utilities and fixtures for adledger integration tests

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::net::SocketAddr;

pub use adledger::attribution::MetaClient;
pub use adledger::db::{create_pool, init_db, queries, AppState, DbPool};
pub use adledger::models::*;
pub use adledger::payments::stripe::sign_payload;
pub use adledger::payments::StripeClient;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// A unique on-disk database path. Pools need a real file so every
/// connection sees the same data.
pub fn temp_db_path() -> String {
    std::env::temp_dir()
        .join(format!("adledger_test_{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

/// Pool over a fresh file-backed database with schema initialized
pub fn setup_test_pool(path: &str) -> DbPool {
    let pool = create_pool(path).expect("Failed to create test pool");
    let conn = pool.get().expect("Failed to get connection");
    init_db(&conn).expect("Failed to initialize schema");
    pool
}

/// Application state wired for tests: no default destination, Meta
/// client pointed at a placeholder host that is never contacted unless
/// a test overrides it.
pub fn test_state(pool: DbPool) -> AppState {
    AppState {
        db: pool,
        stripe: StripeClient::new("sk_test_xxx".to_string(), TEST_WEBHOOK_SECRET.to_string()),
        meta: MetaClient::with_base_url("http://127.0.0.1:9".to_string()),
        default_destination: None,
    }
}

/// Serve the full API router on an ephemeral port.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let app = adledger::handlers::router().with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    addr
}

/// Insert a conversion row directly, with full control over created_at.
pub fn insert_test_conversion(
    conn: &Connection,
    source_event_id: &str,
    email: &str,
    amount_cents: i64,
    created_at: i64,
) {
    conn.execute(
        "INSERT INTO conversions (id, source_event_id, customer_email, amount_cents, currency, status, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, 'jpy', 'completed', '{}', ?5)",
        params![
            uuid::Uuid::new_v4().to_string(),
            source_event_id,
            email,
            amount_cents,
            created_at,
        ],
    )
    .expect("Failed to insert test conversion");
}

/// Create a campaign mapping with default credentials
pub fn create_test_mapping(conn: &Connection, campaign_id: &str, pixel_id: &str) -> CampaignMapping {
    let input = CreateCampaignMapping {
        campaign_id: campaign_id.to_string(),
        pixel_id: pixel_id.to_string(),
        access_token: format!("token_{campaign_id}"),
        campaign_name: Some(format!("Test Campaign {campaign_id}")),
    };
    queries::upsert_campaign_mapping(conn, &input).expect("Failed to create test mapping")
}

/// A signed webhook delivery body + header pair
pub fn signed_webhook(body: &serde_json::Value) -> (String, String) {
    let payload = body.to_string();
    let header = sign_payload(
        TEST_WEBHOOK_SECRET,
        chrono::Utc::now().timestamp(),
        payload.as_bytes(),
    );
    (payload, header)
}

/// A minimal checkout.session.completed event payload
pub fn checkout_event(event_id: &str, email: &str, amount: i64) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": format!("cs_{event_id}"),
                "customer_details": { "email": email },
                "amount_total": amount,
                "currency": "jpy",
                "payment_status": "paid"
            }
        }
    })
}

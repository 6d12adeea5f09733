use rusqlite::Connection;

/// Initialize the ledger database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Conversions (the ledger)
        -- source_event_id carries the UNIQUE constraint that makes ingestion
        -- idempotent under at-least-once webhook delivery. The constraint is
        -- the authoritative guard; the pre-insert existence check is only an
        -- optimization.
        CREATE TABLE IF NOT EXISTS conversions (
            id TEXT PRIMARY KEY,
            source_event_id TEXT NOT NULL UNIQUE,
            customer_email TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
            currency TEXT NOT NULL,
            status TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversions_created ON conversions(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_conversions_email ON conversions(customer_email);

        -- Campaign mappings (attribution routing)
        -- Soft delete via is_active: deactivated rows are invisible to the
        -- fan-out lookup but kept for audit.
        CREATE TABLE IF NOT EXISTS campaign_mappings (
            id TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL UNIQUE,
            pixel_id TEXT NOT NULL,
            access_token TEXT NOT NULL,
            campaign_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_campaign_mappings_active
            ON campaign_mappings(campaign_id) WHERE is_active = 1;
        "#,
    )?;
    Ok(())
}

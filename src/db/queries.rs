use chrono::Utc;
use rusqlite::{params, types::Value, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    query_all, query_one, CAMPAIGN_MAPPING_COLS, CONVERSION_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Conversions ============

/// Outcome of an insert attempt against the ledger.
#[derive(Debug)]
pub enum ConversionInsert {
    Inserted(Conversion),
    /// The source event id is already recorded. This is the canonical
    /// duplicate signal: the UNIQUE constraint fires even when two
    /// deliveries of the same event race past the existence check.
    DuplicateEvent,
}

/// Insert a conversion row, treating a uniqueness violation on
/// `source_event_id` as the expected duplicate-delivery outcome.
pub fn insert_conversion(conn: &Connection, input: &CreateConversion) -> Result<ConversionInsert> {
    let id = gen_id();
    let created_at = now();
    let metadata = input.metadata.to_string();

    let result = conn.execute(
        "INSERT INTO conversions (id, source_event_id, customer_email, amount_cents, currency, status, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            input.source_event_id,
            input.customer_email,
            input.amount_cents,
            input.currency,
            input.status,
            metadata,
            created_at,
        ],
    );

    match result {
        Ok(_) => Ok(ConversionInsert::Inserted(Conversion {
            id,
            source_event_id: input.source_event_id.clone(),
            customer_email: input.customer_email.clone(),
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: input.status.clone(),
            metadata,
            created_at,
        })),
        // Specifically the UNIQUE violation; CHECK failures still error
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(ConversionInsert::DuplicateEvent)
        }
        Err(e) => Err(e.into()),
    }
}

/// Look up a conversion by its originating event id.
pub fn get_conversion_by_event_id(
    conn: &Connection,
    source_event_id: &str,
) -> Result<Option<Conversion>> {
    query_one(
        conn,
        &format!("SELECT {CONVERSION_COLS} FROM conversions WHERE source_event_id = ?1"),
        &[&source_event_id],
    )
}

/// Escape LIKE wildcards so filter input matches literally.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Build the WHERE clause shared by listing, summary, and export so all
/// three operate over the same filtered set.
fn conversion_filter(filters: &ConversionFilters) -> (String, Vec<Value>) {
    let mut clause = String::from("WHERE 1=1");
    let mut values: Vec<Value> = Vec::new();

    if let Some(email) = &filters.email {
        clause.push_str(&format!(
            " AND LOWER(customer_email) LIKE '%' || LOWER(?{}) || '%' ESCAPE '\\'",
            values.len() + 1
        ));
        values.push(escape_like(email).into());
    }
    if let Some(start) = filters.start {
        clause.push_str(&format!(" AND created_at >= ?{}", values.len() + 1));
        values.push(start.into());
    }
    if let Some(end) = filters.end {
        clause.push_str(&format!(" AND created_at <= ?{}", values.len() + 1));
        values.push(end.into());
    }

    (clause, values)
}

/// List conversions matching the filters, newest first, with the total
/// count across all pages.
pub fn list_conversions(
    conn: &Connection,
    filters: &ConversionFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Conversion>, i64)> {
    let (clause, values) = conversion_filter(filters);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM conversions {clause}"),
        rusqlite::params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {CONVERSION_COLS} FROM conversions {clause}
         ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
        values.len() + 1,
        values.len() + 2
    );
    let mut page_values = values;
    page_values.push(limit.into());
    page_values.push(offset.into());

    let mut stmt = conn.prepare(&sql)?;
    let conversions = stmt
        .query_map(
            rusqlite::params_from_iter(page_values.iter()),
            super::from_row::FromRow::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((conversions, total))
}

/// Aggregate amount and count over the full filtered set, independent of
/// any pagination window. An empty set sums to 0.
pub fn summarize_conversions(
    conn: &Connection,
    filters: &ConversionFilters,
) -> Result<ConversionSummary> {
    let (clause, values) = conversion_filter(filters);

    let (total_amount, total_conversions) = conn.query_row(
        &format!("SELECT COALESCE(SUM(amount_cents), 0), COUNT(*) FROM conversions {clause}"),
        rusqlite::params_from_iter(values.iter()),
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
    )?;

    Ok(ConversionSummary {
        total_amount,
        total_conversions,
    })
}

/// Fetch the full filtered set, unpaginated, for CSV export.
pub fn export_conversions(
    conn: &Connection,
    filters: &ConversionFilters,
) -> Result<Vec<Conversion>> {
    let (clause, values) = conversion_filter(filters);
    let sql = format!(
        "SELECT {CONVERSION_COLS} FROM conversions {clause} ORDER BY created_at DESC, id DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let conversions = stmt
        .query_map(
            rusqlite::params_from_iter(values.iter()),
            super::from_row::FromRow::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(conversions)
}

// ============ Campaign Mappings ============

/// Create a campaign mapping, or reactivate and re-credential an existing
/// one with the same campaign id (including soft-deleted rows).
pub fn upsert_campaign_mapping(
    conn: &Connection,
    input: &CreateCampaignMapping,
) -> Result<CampaignMapping> {
    let ts = now();
    conn.execute(
        "INSERT INTO campaign_mappings (id, campaign_id, pixel_id, access_token, campaign_name, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
         ON CONFLICT(campaign_id) DO UPDATE SET
             pixel_id = excluded.pixel_id,
             access_token = excluded.access_token,
             campaign_name = excluded.campaign_name,
             is_active = 1,
             updated_at = excluded.updated_at",
        params![
            gen_id(),
            input.campaign_id,
            input.pixel_id,
            input.access_token,
            input.campaign_name,
            ts,
        ],
    )?;

    // The row is guaranteed to exist after the upsert
    get_mapping(conn, &input.campaign_id)?.ok_or_else(|| {
        crate::error::AppError::Internal("upserted campaign mapping not found".into())
    })
}

fn get_mapping(conn: &Connection, campaign_id: &str) -> Result<Option<CampaignMapping>> {
    query_one(
        conn,
        &format!("SELECT {CAMPAIGN_MAPPING_COLS} FROM campaign_mappings WHERE campaign_id = ?1"),
        &[&campaign_id],
    )
}

/// Resolve an active mapping by campaign id. Deactivated mappings are
/// invisible here; absence signals "use the default destination".
pub fn get_active_mapping(conn: &Connection, campaign_id: &str) -> Result<Option<CampaignMapping>> {
    query_one(
        conn,
        &format!(
            "SELECT {CAMPAIGN_MAPPING_COLS} FROM campaign_mappings
             WHERE campaign_id = ?1 AND is_active = 1"
        ),
        &[&campaign_id],
    )
}

/// List active mappings, newest first.
pub fn list_active_mappings(conn: &Connection) -> Result<Vec<CampaignMapping>> {
    query_all(
        conn,
        &format!(
            "SELECT {CAMPAIGN_MAPPING_COLS} FROM campaign_mappings
             WHERE is_active = 1 ORDER BY created_at DESC"
        ),
        &[],
    )
}

/// Administrative listing including deactivated mappings (audit view).
pub fn list_all_mappings(conn: &Connection) -> Result<Vec<CampaignMapping>> {
    query_all(
        conn,
        &format!(
            "SELECT {CAMPAIGN_MAPPING_COLS} FROM campaign_mappings ORDER BY created_at DESC"
        ),
        &[],
    )
}

/// Partially update a mapping by campaign id. Returns None when no such
/// mapping exists, or when no fields were provided.
pub fn update_campaign_mapping(
    conn: &Connection,
    campaign_id: &str,
    input: &UpdateCampaignMapping,
) -> Result<Option<CampaignMapping>> {
    let mut sets: Vec<&'static str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(pixel_id) = &input.pixel_id {
        sets.push("pixel_id = ?");
        values.push(pixel_id.clone().into());
    }
    if let Some(access_token) = &input.access_token {
        sets.push("access_token = ?");
        values.push(access_token.clone().into());
    }
    if let Some(campaign_name) = &input.campaign_name {
        sets.push("campaign_name = ?");
        values.push(campaign_name.clone().into());
    }
    if let Some(is_active) = input.is_active {
        sets.push("is_active = ?");
        values.push(i64::from(is_active).into());
    }

    if sets.is_empty() {
        return Ok(None);
    }

    sets.push("updated_at = ?");
    values.push(now().into());
    values.push(campaign_id.to_string().into());

    let sql = format!(
        "UPDATE campaign_mappings SET {} WHERE campaign_id = ?",
        sets.join(", ")
    );
    let affected = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
    if affected == 0 {
        return Ok(None);
    }

    get_mapping(conn, campaign_id)
}

/// Soft-delete a mapping: it disappears from active lookups and listings
/// but stays in storage for audit. Returns false when not found.
pub fn deactivate_campaign_mapping(conn: &Connection, campaign_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE campaign_mappings SET is_active = 0, updated_at = ?1 WHERE campaign_id = ?2",
        params![now(), campaign_id],
    )?;
    Ok(affected > 0)
}

//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::{CampaignMapping, Conversion};

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const CONVERSION_COLS: &str =
    "id, source_event_id, customer_email, amount_cents, currency, status, metadata, created_at";

pub const CAMPAIGN_MAPPING_COLS: &str =
    "id, campaign_id, pixel_id, access_token, campaign_name, is_active, created_at, updated_at";

// ============ FromRow Implementations ============

impl FromRow for Conversion {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Conversion {
            id: row.get(0)?,
            source_event_id: row.get(1)?,
            customer_email: row.get(2)?,
            amount_cents: row.get(3)?,
            currency: row.get(4)?,
            status: row.get(5)?,
            metadata: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl FromRow for CampaignMapping {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CampaignMapping {
            id: row.get(0)?,
            campaign_id: row.get(1)?,
            pixel_id: row.get(2)?,
            access_token: row.get(3)?,
            campaign_name: row.get(4)?,
            is_active: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

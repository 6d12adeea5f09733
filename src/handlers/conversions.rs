//! Conversion reporting: filtered listing with summary, and CSV export.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::export;
use crate::extractors::{Json, Query};
use crate::models::ConversionFilters;
use crate::pagination::{PageInfo, PageQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/conversions", get(list_conversions))
        .route("/api/conversions/export", get(export_conversions))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub email: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ConversionListQuery {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Parse a filter bound as either a bare date or a full RFC 3339 instant.
/// Bare dates expand to the start or end of that day (UTC) so a
/// same-day range covers the whole day.
fn parse_date_bound(value: &str, end_of_day: bool) -> Result<i64> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
        } else {
            NaiveTime::default()
        };
        return Ok(date.and_time(time).and_utc().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    Err(AppError::BadRequest(msg::INVALID_DATE.to_string()))
}

fn filters_from_query(
    email: &Option<String>,
    start_date: &Option<String>,
    end_date: &Option<String>,
) -> Result<ConversionFilters> {
    Ok(ConversionFilters {
        email: email.clone().filter(|e| !e.is_empty()),
        start: start_date
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_date_bound(s, false))
            .transpose()?,
        end: end_date
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_date_bound(s, true))
            .transpose()?,
    })
}

/// List conversions, newest first, with pagination metadata and a
/// summary aggregated over the full filtered set.
async fn list_conversions(
    State(state): State<AppState>,
    Query(query): Query<ConversionListQuery>,
) -> Result<impl IntoResponse> {
    let filters = filters_from_query(&query.email, &query.start_date, &query.end_date)?;
    let paging = query.page_query();
    let (page, limit) = (paging.page(), paging.limit());

    let conn = state.db.get()?;
    let (conversions, total) = queries::list_conversions(&conn, &filters, limit, paging.offset())?;
    let summary = queries::summarize_conversions(&conn, &filters)?;

    Ok(Json(json!({
        "conversions": conversions,
        "pagination": PageInfo::new(page, limit, total),
        "summary": summary,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionExportQuery {
    pub email: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Export the full filtered set as a CSV attachment.
async fn export_conversions(
    State(state): State<AppState>,
    Query(query): Query<ConversionExportQuery>,
) -> Result<impl IntoResponse> {
    let filters = filters_from_query(&query.email, &query.start_date, &query.end_date)?;

    let conn = state.db.get()?;
    let conversions = queries::export_conversions(&conn, &filters)?;
    let csv = export::conversions_to_csv(&conversions);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::export_filename()),
            ),
        ],
        csv,
    ))
}

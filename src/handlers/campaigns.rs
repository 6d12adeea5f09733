//! Campaign mapping management.

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, Query};
use crate::models::{CreateCampaignMapping, UpdateCampaignMapping};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/campaigns",
        get(list_campaigns)
            .post(create_campaign)
            .put(update_campaign)
            .delete(delete_campaign),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    /// Include deactivated mappings (audit view)
    #[serde(default)]
    include_inactive: bool,
}

async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let conn = state.db.get()?;
    let mappings = if query.include_inactive {
        queries::list_all_mappings(&conn)?
    } else {
        queries::list_active_mappings(&conn)?
    };
    Ok(Json(json!({ "campaigns": mappings })))
}

/// Loose creation payload so missing fields produce one uniform message
/// rather than a per-field deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    campaign_id: Option<String>,
    pixel_id: Option<String>,
    access_token: Option<String>,
    campaign_name: Option<String>,
}

/// Create a mapping, or reactivate and overwrite an existing one with
/// the same campaign id.
async fn create_campaign(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> Result<impl IntoResponse> {
    let (Some(campaign_id), Some(pixel_id), Some(access_token)) = (
        body.campaign_id.filter(|s| !s.is_empty()),
        body.pixel_id.filter(|s| !s.is_empty()),
        body.access_token.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest(msg::CAMPAIGN_FIELDS_REQUIRED.to_string()));
    };

    let input = CreateCampaignMapping {
        campaign_id,
        pixel_id,
        access_token,
        campaign_name: body.campaign_name,
    };

    let conn = state.db.get()?;
    let mapping = queries::upsert_campaign_mapping(&conn, &input)?;
    tracing::info!(campaign_id = %mapping.campaign_id, "campaign mapping upserted");
    Ok(Json(json!({ "campaign": mapping })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    campaign_id: Option<String>,
    #[serde(flatten)]
    changes: UpdateCampaignMapping,
}

async fn update_campaign(
    State(state): State<AppState>,
    Json(body): Json<UpdateRequest>,
) -> Result<impl IntoResponse> {
    let campaign_id = body
        .campaign_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(msg::CAMPAIGN_ID_REQUIRED.to_string()))?;

    // Credentials may be omitted but never blanked
    if body.changes.pixel_id.as_deref() == Some("")
        || body.changes.access_token.as_deref() == Some("")
    {
        return Err(AppError::BadRequest(msg::CAMPAIGN_CREDENTIALS_EMPTY.to_string()));
    }

    let conn = state.db.get()?;
    let mapping = queries::update_campaign_mapping(&conn, &campaign_id, &body.changes)?
        .or_not_found(msg::CAMPAIGN_NOT_FOUND)?;
    Ok(Json(json!({ "campaign": mapping })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteQuery {
    campaign_id: Option<String>,
}

/// Soft-delete: the mapping disappears from routing but stays on disk.
async fn delete_campaign(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse> {
    let campaign_id = query
        .campaign_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(msg::CAMPAIGN_ID_REQUIRED.to_string()))?;

    let conn = state.db.get()?;
    if !queries::deactivate_campaign_mapping(&conn, &campaign_id)? {
        return Err(AppError::NotFound(msg::CAMPAIGN_NOT_FOUND.to_string()));
    }
    tracing::info!(%campaign_id, "campaign mapping deactivated");
    Ok(Json(json!({ "status": "success" })))
}

use serde::{Deserialize, Serialize};

use crate::attribution::Destination;

/// Routing rule mapping a marketing campaign id to an attribution destination.
///
/// Mappings are never hard-deleted: deactivation flips `is_active` so that
/// historical fan-out sends stay auditable against the credentials used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMapping {
    pub id: String,
    /// Externally supplied identifier, unique among mappings
    pub campaign_id: String,
    pub pixel_id: String,
    pub access_token: String,
    pub campaign_name: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CampaignMapping {
    pub fn destination(&self) -> Destination {
        Destination {
            pixel_id: self.pixel_id.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Data required to create (or reactivate) a campaign mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignMapping {
    pub campaign_id: String,
    pub pixel_id: String,
    pub access_token: String,
    pub campaign_name: Option<String>,
}

/// Partial update of a campaign mapping, keyed by campaign id.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignMapping {
    pub pixel_id: Option<String>,
    pub access_token: Option<String>,
    pub campaign_name: Option<String>,
    pub is_active: Option<bool>,
}

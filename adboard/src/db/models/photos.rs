//! Database models for photo attachments.

use crate::types::{AdId, PhotoId};
use chrono::{DateTime, Utc};

/// Database response for a photo row.
///
/// Photos are created together with their ad (or attached afterwards), never
/// individually updated, and deleted in bulk when the owning ad is deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotoDBResponse {
    pub id: PhotoId,
    pub ad_id: AdId,
    pub photo_url: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

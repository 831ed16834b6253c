//! Database models for ads.

use crate::types::{AdId, AdTypeId, CityId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new ad.
///
/// The id is generated by the caller so the photo files can be stored under
/// the ad's directory before the rows are inserted. `ad_type_id` has already
/// been resolved from the human-readable type name; the name is carried along
/// for the response.
#[derive(Debug, Clone)]
pub struct AdCreateDBRequest {
    pub id: AdId,
    pub user_id: UserId,
    pub category_id: i32,
    pub ad_type_id: AdTypeId,
    pub ad_type: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub city_id: CityId,
    pub photo_urls: Vec<String>,
}

/// Database request for updating an ad.
///
/// `None` fields are left untouched (COALESCE semantics). Photos are never
/// modified through an update.
#[derive(Debug, Clone, Default)]
pub struct AdUpdateDBRequest {
    pub category_id: Option<i32>,
    pub ad_type_id: Option<AdTypeId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub city_id: Option<CityId>,
}

/// Database response for an ad with its photos aggregated.
///
/// `photos` holds the stored photo references in insertion order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdDBResponse {
    pub id: AdId,
    pub user_id: UserId,
    pub category_id: i32,
    pub ad_type_id: AdTypeId,
    pub ad_type: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub city_id: CityId,
    pub is_sold: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub photos: Vec<String>,
}

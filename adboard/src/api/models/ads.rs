//! API request/response models for ads.

use crate::api::models::pagination::Pagination;
use crate::db::models::ads::AdDBResponse;
use crate::types::{AdId, CityId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Allow-list of sortable ad fields.
///
/// The query text only ever sees the column name returned by
/// [`AdSortField::column`]; any other requested sort field is rejected at the
/// query-string boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdSortField {
    Price,
    CreatedAt,
    Title,
}

impl AdSortField {
    /// Storage column this field sorts by.
    pub fn column(&self) -> &'static str {
        match self {
            AdSortField::Price => "price",
            AdSortField::CreatedAt => "created_at",
            AdSortField::Title => "title",
        }
    }
}

/// Sort direction. Anything other than `desc` (case-insensitive) means
/// ascending, matching the interface's default-ASC contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query parameters for searching ads. All filters optional, AND-combined.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchAdsQuery {
    /// Case-insensitive substring match against title or description
    pub keyword: Option<String>,

    /// Exact match on category id
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub category: Option<i32>,

    /// Inclusive lower price bound
    #[param(value_type = Option<f64>)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub price_min: Option<Decimal>,

    /// Inclusive upper price bound
    #[param(value_type = Option<f64>)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub price_max: Option<Decimal>,

    /// Exact match on city id
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub city: Option<CityId>,

    /// Sort field: price, created_at or title
    #[param(inline)]
    pub sort_by: Option<AdSortField>,

    /// Sort direction: asc or desc (default asc)
    pub order: Option<String>,

    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// A single ad with its photo references in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AdId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub category_id: i32,
    pub ad_type: String,
    pub title: String,
    pub description: String,
    /// Decimal price serialized as a string, e.g. "149.99"
    #[schema(value_type = String)]
    pub price: Decimal,
    pub city_id: CityId,
    pub is_sold: bool,
    pub created_at: DateTime<Utc>,
    /// Photo references resolvable under the `/uploads` prefix
    pub photos: Vec<String>,
}

impl From<AdDBResponse> for AdResponse {
    fn from(db: AdDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            category_id: db.category_id,
            ad_type: db.ad_type,
            title: db.title,
            description: db.description,
            price: db.price,
            city_id: db.city_id,
            is_sold: db.is_sold,
            created_at: db.created_at,
            photos: db.photos,
        }
    }
}

/// Partial update for an ad. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AdUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    /// Non-negative price
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    /// City id
    pub city: Option<CityId>,
    /// Ad type name, e.g. "sale"
    pub ad_type: Option<String>,
}

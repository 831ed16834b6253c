use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    AppState,
    api::handlers::auth::require_field,
    api::models::{
        MessageResponse,
        ads::{AdResponse, AdUpdateRequest, SearchAdsQuery, SortOrder},
    },
    api::models::users::CurrentUser,
    db::{
        errors::DbError,
        handlers::{AdTypes, Ads, Repository, ads::AdFilter},
        models::ads::{AdCreateDBRequest, AdUpdateDBRequest},
    },
    errors::Error,
    types::{AdId, AdTypeId, abbrev_uuid},
};

/// Cap on photo files per ad.
pub const MAX_PHOTOS_PER_AD: usize = 10;

/// Map the repository's not-found-or-not-owned result onto the API error.
///
/// The message is identical for a missing ad and a foreign one, so callers
/// cannot probe for existence.
fn ownership_error(e: DbError) -> Error {
    match e {
        DbError::NotFound => Error::Forbidden {
            message: "You do not have access to this ad".to_string(),
        },
        other => Error::Database(other),
    }
}

fn parse_price(value: &str) -> Result<Decimal, Error> {
    let price = Decimal::from_str(value.trim()).map_err(|_| Error::BadRequest {
        message: "Price must be a number".to_string(),
    })?;
    validate_price(price)?;
    Ok(price)
}

fn validate_price(price: Decimal) -> Result<(), Error> {
    if price < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Price must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn parse_id_field(value: &str, name: &str) -> Result<i32, Error> {
    value.trim().parse().map_err(|_| Error::BadRequest {
        message: format!("Invalid {name}"),
    })
}

async fn resolve_ad_type(state: &AppState, name: &str) -> Result<AdTypeId, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut ad_types = AdTypes::new(&mut conn);
    ad_types.resolve(name).await?.ok_or_else(|| Error::BadRequest {
        message: "Unknown ad type".to_string(),
    })
}

/// Search ads
///
/// Public endpoint. All filters are optional and AND-combined; results carry
/// each ad's photo references in insertion order.
#[utoipa::path(
    get,
    path = "/ads",
    params(SearchAdsQuery),
    tag = "ads",
    responses(
        (status = 200, description = "Matching ads", body = [AdResponse]),
        (status = 400, description = "Malformed filter or unknown sort field"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn search_ads(State(state): State<AppState>, Query(query): Query<SearchAdsQuery>) -> Result<Json<Vec<AdResponse>>, Error> {
    let filter = AdFilter {
        keyword: query.keyword,
        category_id: query.category,
        price_min: query.price_min,
        price_max: query.price_max,
        city_id: query.city,
        sort: query.sort_by,
        order: SortOrder::from_param(query.order.as_deref()),
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut ads = Ads::new(&mut conn);

    let results = ads.list(&filter).await?;

    Ok(Json(results.into_iter().map(AdResponse::from).collect()))
}

/// Create an ad
///
/// Multipart body with the ad fields plus up to 10 photo files under the
/// `photos` field. The ad row and its photo rows are inserted in one
/// transaction.
#[utoipa::path(
    post,
    path = "/ads",
    tag = "ads",
    security(("bearer_token" = [])),
    request_body(
        content_type = "multipart/form-data",
        description = "Fields: title, description, category_id, price, city, ad_type; files: photos (max 10)"
    ),
    responses(
        (status = 201, description = "Ad created", body = AdResponse),
        (status = 400, description = "Missing fields, unknown ad type, or too many photos"),
        (status = 401, description = "Missing token"),
        (status = 413, description = "Photo exceeds the size limit"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn create_ad(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AdResponse>), Error> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category_id: Option<String> = None;
    let mut price: Option<String> = None;
    let mut city: Option<String> = None;
    let mut ad_type: Option<String> = None;
    let mut photos: Vec<(String, bytes::Bytes)> = Vec::new();

    let max_photo_size = state.config.uploads.max_photo_size;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "title" => title = Some(read_text_field(field).await?),
            "description" => description = Some(read_text_field(field).await?),
            "category_id" => category_id = Some(read_text_field(field).await?),
            "price" => price = Some(read_text_field(field).await?),
            "city" => city = Some(read_text_field(field).await?),
            "ad_type" => ad_type = Some(read_text_field(field).await?),
            "photos" => {
                if photos.len() >= MAX_PHOTOS_PER_AD {
                    return Err(Error::BadRequest {
                        message: format!("At most {MAX_PHOTOS_PER_AD} photos can be attached to an ad"),
                    });
                }

                let original_name = field.file_name().unwrap_or("photo").to_string();
                let content = field.bytes().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read photo data: {e}"),
                })?;

                // Browsers send an empty part when no file was chosen
                if content.is_empty() {
                    continue;
                }

                if content.len() as u64 > max_photo_size {
                    return Err(Error::PayloadTooLarge {
                        message: format!("Photo '{original_name}' exceeds the maximum size of {max_photo_size} bytes"),
                    });
                }

                photos.push((original_name, content));
            }
            // Unknown fields are drained and ignored
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    let title = require_field(title, "title")?;
    let description = require_field(description, "description")?;
    let category_id = parse_id_field(&require_field(category_id, "category_id")?, "category_id")?;
    let price = parse_price(&require_field(price, "price")?)?;
    let city_id = parse_id_field(&require_field(city, "city")?, "city")?;
    let ad_type = require_field(ad_type, "ad_type")?;

    let ad_type_id = resolve_ad_type(&state, &ad_type).await?;

    // The id is generated up front so the photo files can be stored under the
    // ad's directory before the rows exist
    let ad_id = Uuid::new_v4();

    let mut photo_urls = Vec::with_capacity(photos.len());
    for (original_name, content) in &photos {
        let url = state.photo_storage.store(ad_id, content, original_name).await?;
        photo_urls.push(url);
    }

    let request = AdCreateDBRequest {
        id: ad_id,
        user_id: current_user.id,
        category_id,
        ad_type_id,
        ad_type,
        title,
        description,
        price,
        city_id,
        photo_urls: photo_urls.clone(),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut ads = Ads::new(&mut conn);

    let ad = match ads.create(&request).await {
        Ok(ad) => ad,
        Err(e) => {
            // The row transaction rolled back; remove the already-stored
            // files so nothing dangles
            for url in &photo_urls {
                if let Err(cleanup_err) = state.photo_storage.delete(url).await {
                    tracing::warn!("Failed to clean up stored photo {url}: {cleanup_err}");
                }
            }
            return Err(Error::Database(e));
        }
    };

    Ok((StatusCode::CREATED, Json(AdResponse::from(ad))))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, Error> {
    let name = field.name().unwrap_or("").to_string();
    field.text().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read field '{name}': {e}"),
    })
}

/// Update an ad
///
/// Owner only; absent fields keep their current value. Photos are never
/// modified through an update.
#[utoipa::path(
    put,
    path = "/ads/{id}",
    request_body = AdUpdateRequest,
    params(("id" = Uuid, Path, description = "Ad id")),
    tag = "ads",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Ad updated", body = MessageResponse),
        (status = 400, description = "Unknown ad type or invalid price"),
        (status = 401, description = "Missing token"),
        (status = 403, description = "Ad missing or not owned by the caller"),
    )
)]
#[tracing::instrument(skip_all, fields(ad_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&current_user.id)))]
pub async fn update_ad(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<AdId>,
    Json(request): Json<AdUpdateRequest>,
) -> Result<Json<MessageResponse>, Error> {
    if let Some(price) = request.price {
        validate_price(price)?;
    }

    // Re-resolve the type name when one is supplied
    let ad_type_id = match &request.ad_type {
        Some(name) => Some(resolve_ad_type(&state, name).await?),
        None => None,
    };

    let update = AdUpdateDBRequest {
        category_id: request.category_id,
        ad_type_id,
        title: request.title,
        description: request.description,
        price: request.price,
        city_id: request.city,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut ads = Ads::new(&mut conn);

    ads.update_owned(id, current_user.id, &update).await.map_err(ownership_error)?;

    Ok(Json(MessageResponse::new("Ad updated successfully")))
}

/// Delete an ad
///
/// Owner only. Removes the ad's photo rows and the ad in one transaction,
/// then removes the stored photo files.
#[utoipa::path(
    delete,
    path = "/ads/{id}",
    params(("id" = Uuid, Path, description = "Ad id")),
    tag = "ads",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Ad deleted", body = MessageResponse),
        (status = 401, description = "Missing token"),
        (status = 403, description = "Ad missing or not owned by the caller"),
    )
)]
#[tracing::instrument(skip_all, fields(ad_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&current_user.id)))]
pub async fn delete_ad(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<AdId>,
) -> Result<Json<MessageResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut ads = Ads::new(&mut conn);

    let photo_urls = ads.delete_owned(id, current_user.id).await.map_err(ownership_error)?;

    // The rows are gone; file removal is best-effort. A leaked file is
    // unreachable through the API and harmless, whereas failing the request
    // now would report a deletion that did happen.
    for url in &photo_urls {
        if let Err(e) = state.photo_storage.delete(url).await {
            tracing::warn!("Failed to remove stored photo {url}: {e}");
        }
    }

    Ok(Json(MessageResponse::new("Ad deleted successfully")))
}

/// Mark an ad as sold
///
/// Owner only, idempotent.
#[utoipa::path(
    patch,
    path = "/ads/{id}/mark-sold",
    params(("id" = Uuid, Path, description = "Ad id")),
    tag = "ads",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Ad marked as sold", body = MessageResponse),
        (status = 401, description = "Missing token"),
        (status = 403, description = "Ad missing or not owned by the caller"),
    )
)]
#[tracing::instrument(skip_all, fields(ad_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&current_user.id)))]
pub async fn mark_ad_sold(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<AdId>,
) -> Result<Json<MessageResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut ads = Ads::new(&mut conn);

    ads.mark_sold(id, current_user.id).await.map_err(ownership_error)?;

    Ok(Json(MessageResponse::new("Ad marked as sold")))
}

//! Database repository for ads and their photo rows.
//!
//! Multi-statement writes (ad + photos insert, photos-then-ad delete) run in
//! a single transaction opened on the borrowed connection, so an interrupted
//! request can never leave partial state behind.

use crate::api::models::ads::{AdSortField, SortOrder};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::{
        ads::{AdCreateDBRequest, AdDBResponse, AdUpdateDBRequest},
        photos::PhotoDBResponse,
    },
};
use crate::types::{AdId, AdTypeId, CityId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

/// Filter for searching ads. All filters are optional and AND-combined.
#[derive(Debug, Clone)]
pub struct AdFilter {
    /// Case-insensitive substring match against title OR description
    pub keyword: Option<String>,
    /// Exact match on category id
    pub category_id: Option<i32>,
    /// Inclusive lower bound on price
    pub price_min: Option<Decimal>,
    /// Inclusive upper bound on price
    pub price_max: Option<Decimal>,
    /// Exact match on city id
    pub city_id: Option<CityId>,
    /// Sort field; absent means newest first
    pub sort: Option<AdSortField>,
    pub order: SortOrder,
    pub skip: i64,
    pub limit: i64,
}

impl Default for AdFilter {
    fn default() -> Self {
        Self {
            keyword: None,
            category_id: None,
            price_min: None,
            price_max: None,
            city_id: None,
            sort: None,
            order: SortOrder::Asc,
            skip: 0,
            limit: crate::api::models::pagination::DEFAULT_LIMIT,
        }
    }
}

// Database entity model for the ads table
#[derive(Debug, Clone, FromRow)]
struct Ad {
    pub id: AdId,
    pub user_id: UserId,
    pub category_id: i32,
    pub ad_type_id: AdTypeId,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub city_id: CityId,
    pub is_sold: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(Ad, String, Vec<String>)> for AdDBResponse {
    fn from((ad, ad_type, photos): (Ad, String, Vec<String>)) -> Self {
        Self {
            id: ad.id,
            user_id: ad.user_id,
            category_id: ad.category_id,
            ad_type_id: ad.ad_type_id,
            ad_type,
            title: ad.title,
            description: ad.description,
            price: ad.price,
            city_id: ad.city_id,
            is_sold: ad.is_sold,
            created_at: ad.created_at,
            updated_at: ad.updated_at,
            photos,
        }
    }
}

/// Shared SELECT for ad rows with the type name joined in and photo
/// references aggregated in insertion order.
const AD_WITH_PHOTOS_SELECT: &str = "SELECT a.id, a.user_id, a.category_id, a.ad_type_id, t.name AS ad_type, \
     a.title, a.description, a.price, a.city_id, a.is_sold, a.created_at, a.updated_at, \
     COALESCE(array_agg(p.photo_url ORDER BY p.position) FILTER (WHERE p.id IS NOT NULL), ARRAY[]::text[]) AS photos \
     FROM ads a \
     JOIN ad_types t ON t.id = a.ad_type_id \
     LEFT JOIN photos p ON p.ad_id = a.id";

pub struct Ads<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Ads<'c> {
    type CreateRequest = AdCreateDBRequest;
    type Response = AdDBResponse;
    type Id = AdId;
    type Filter = AdFilter;

    #[instrument(skip(self, request), fields(ad_id = %abbrev_uuid(&request.id), owner = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        // Insert ad
        let ad = sqlx::query_as::<_, Ad>(
            r#"
            INSERT INTO ads (id, user_id, category_id, ad_type_id, title, description, price, city_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.category_id)
        .bind(request.ad_type_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.price)
        .bind(request.city_id)
        .fetch_one(&mut *tx)
        .await?;

        // Insert one photo row per stored file, preserving upload order
        for (position, photo_url) in request.photo_urls.iter().enumerate() {
            sqlx::query("INSERT INTO photos (id, ad_id, photo_url, position) VALUES ($1, $2, $3, $4)")
                .bind(Uuid::new_v4())
                .bind(request.id)
                .bind(photo_url)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(AdDBResponse::from((ad, request.ad_type.clone(), request.photo_urls.clone())))
    }

    #[instrument(skip(self), fields(ad_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let ad = sqlx::query_as::<_, AdDBResponse>(&format!("{AD_WITH_PHOTOS_SELECT} WHERE a.id = $1 GROUP BY a.id, t.name"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(ad)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("{AD_WITH_PHOTOS_SELECT} WHERE 1=1"));

        if let Some(keyword) = &filter.keyword {
            let pattern = format!("%{keyword}%");
            query.push(" AND (a.title ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR a.description ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }

        if let Some(category_id) = filter.category_id {
            query.push(" AND a.category_id = ");
            query.push_bind(category_id);
        }

        if let Some(price_min) = filter.price_min {
            query.push(" AND a.price >= ");
            query.push_bind(price_min);
        }

        if let Some(price_max) = filter.price_max {
            query.push(" AND a.price <= ");
            query.push_bind(price_max);
        }

        if let Some(city_id) = filter.city_id {
            query.push(" AND a.city_id = ");
            query.push_bind(city_id);
        }

        query.push(" GROUP BY a.id, t.name");

        // The sort field is a closed enum mapped to column names here, so
        // nothing from the request is ever interpolated into the query text.
        match filter.sort {
            Some(sort) => {
                query.push(format!(" ORDER BY a.{} {}", sort.column(), filter.order.sql()));
            }
            None => {
                query.push(" ORDER BY a.created_at DESC");
            }
        }

        query.push(" LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let ads = query.build_query_as::<AdDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(ads)
    }
}

impl<'c> Ads<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Update an ad on behalf of `caller`.
    ///
    /// Fails with [`DbError::NotFound`] when the ad does not exist OR is not
    /// owned by the caller - the two cases are indistinguishable so existence
    /// is not leaked. Photos are never touched by an update.
    #[instrument(skip(self, request), fields(ad_id = %abbrev_uuid(&id), caller = %abbrev_uuid(&caller)), err)]
    pub async fn update_owned(&mut self, id: AdId, caller: UserId, request: &AdUpdateDBRequest) -> Result<AdDBResponse> {
        let mut tx = self.db.begin().await?;

        // Lock the row while checking ownership so concurrent mutations on
        // the same ad are sequenced
        let owned = sqlx::query_scalar::<_, AdId>("SELECT id FROM ads WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(caller)
            .fetch_optional(&mut *tx)
            .await?;

        if owned.is_none() {
            return Err(DbError::NotFound);
        }

        let ad = sqlx::query_as::<_, Ad>(
            r#"
            UPDATE ads SET
                category_id = COALESCE($2, category_id),
                ad_type_id = COALESCE($3, ad_type_id),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                price = COALESCE($6, price),
                city_id = COALESCE($7, city_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.category_id)
        .bind(request.ad_type_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.price)
        .bind(request.city_id)
        .fetch_one(&mut *tx)
        .await?;

        let ad_type = sqlx::query_scalar::<_, String>("SELECT name FROM ad_types WHERE id = $1")
            .bind(ad.ad_type_id)
            .fetch_one(&mut *tx)
            .await?;

        let photos = sqlx::query_scalar::<_, String>("SELECT photo_url FROM photos WHERE ad_id = $1 ORDER BY position")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(AdDBResponse::from((ad, ad_type, photos)))
    }

    /// Delete an ad on behalf of `caller`, removing its photo rows first.
    ///
    /// Same ownership gate as [`Ads::update_owned`]. Returns the stored photo
    /// references so the caller can remove the files after the rows are gone.
    #[instrument(skip(self), fields(ad_id = %abbrev_uuid(&id), caller = %abbrev_uuid(&caller)), err)]
    pub async fn delete_owned(&mut self, id: AdId, caller: UserId) -> Result<Vec<String>> {
        let mut tx = self.db.begin().await?;

        let owned = sqlx::query_scalar::<_, AdId>("SELECT id FROM ads WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(caller)
            .fetch_optional(&mut *tx)
            .await?;

        if owned.is_none() {
            return Err(DbError::NotFound);
        }

        let photo_urls = sqlx::query_scalar::<_, String>("SELECT photo_url FROM photos WHERE ad_id = $1 ORDER BY position")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        // Photos before the ad: the FK means an interrupted sequence can
        // never orphan photo rows
        sqlx::query("DELETE FROM photos WHERE ad_id = $1").bind(id).execute(&mut *tx).await?;

        sqlx::query("DELETE FROM ads WHERE id = $1").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(photo_urls)
    }

    /// Mark an ad as sold on behalf of `caller`. Idempotent.
    #[instrument(skip(self), fields(ad_id = %abbrev_uuid(&id), caller = %abbrev_uuid(&caller)), err)]
    pub async fn mark_sold(&mut self, id: AdId, caller: UserId) -> Result<()> {
        let result = sqlx::query("UPDATE ads SET is_sold = TRUE, updated_at = NOW() WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(caller)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// All photo rows for an ad, in insertion order.
    #[instrument(skip(self), fields(ad_id = %abbrev_uuid(&ad_id)), err)]
    pub async fn photos_for_ad(&mut self, ad_id: AdId) -> Result<Vec<PhotoDBResponse>> {
        let photos = sqlx::query_as::<_, PhotoDBResponse>("SELECT * FROM photos WHERE ad_id = $1 ORDER BY position")
            .bind(ad_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::seed_user;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn ad_request(user_id: UserId, title: &str, price: i64, photos: Vec<String>) -> AdCreateDBRequest {
        AdCreateDBRequest {
            id: Uuid::new_v4(),
            user_id,
            category_id: 1,
            ad_type_id: 1,
            ad_type: "sale".to_string(),
            title: title.to_string(),
            description: format!("{title} in great condition"),
            price: Decimal::from(price),
            city_id: 1,
            photo_urls: photos,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_ad_with_photos(pool: PgPool) {
        let user = seed_user(&pool, "seller").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let request = ad_request(
            user.id,
            "Red sofa",
            150,
            vec!["ads/a/1-front.jpg".to_string(), "ads/a/2-back.jpg".to_string()],
        );
        let created = repo.create(&request).await.unwrap();

        assert_eq!(created.title, "Red sofa");
        assert_eq!(created.ad_type, "sale");
        assert!(!created.is_sold);
        assert_eq!(created.photos.len(), 2);

        // Photos come back in insertion order
        let fetched = repo.get_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.photos, vec!["ads/a/1-front.jpg", "ads/a/2-back.jpg"]);

        let rows = repo.photos_for_ad(request.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].position, 0);
        assert_eq!(rows[1].position, 1);
    }

    #[sqlx::test]
    async fn test_create_rejects_negative_price(pool: PgPool) {
        let user = seed_user(&pool, "cheapskate").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let mut request = ad_request(user.id, "Broken chair", 0, vec![]);
        request.price = Decimal::from(-1);

        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test]
    async fn test_zero_price_is_allowed(pool: PgPool) {
        let user = seed_user(&pool, "giver").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let request = ad_request(user.id, "Free firewood", 0, vec![]);
        let created = repo.create(&request).await.unwrap();
        assert_eq!(created.price, Decimal::ZERO);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_price_range_and_keyword(pool: PgPool) {
        let user = seed_user(&pool, "searcher").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        repo.create(&ad_request(user.id, "Green sofa", 120, vec![])).await.unwrap();
        repo.create(&ad_request(user.id, "Blue sofa", 250, vec![])).await.unwrap();
        repo.create(&ad_request(user.id, "Oak table", 150, vec![])).await.unwrap();

        let filter = AdFilter {
            price_min: Some(Decimal::from(100)),
            price_max: Some(Decimal::from(200)),
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|ad| ad.price >= Decimal::from(100) && ad.price <= Decimal::from(200)));

        // Adding a keyword further restricts the result set
        let filter = AdFilter {
            keyword: Some("sofa".to_string()),
            ..filter
        };
        let results = repo.list(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Green sofa");
    }

    #[sqlx::test]
    async fn test_search_keyword_is_case_insensitive_and_matches_description(pool: PgPool) {
        let user = seed_user(&pool, "wordy").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let mut request = ad_request(user.id, "Armchair", 80, vec![]);
        request.description = "Comes with a matching SOFA cushion".to_string();
        repo.create(&request).await.unwrap();

        let filter = AdFilter {
            keyword: Some("sofa".to_string()),
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Armchair");
    }

    #[sqlx::test]
    async fn test_search_category_and_city_filters(pool: PgPool) {
        let user = seed_user(&pool, "filterer").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let mut in_category = ad_request(user.id, "Bike", 90, vec![]);
        in_category.category_id = 7;
        in_category.city_id = 2;
        repo.create(&in_category).await.unwrap();
        repo.create(&ad_request(user.id, "Helmet", 30, vec![])).await.unwrap();

        let filter = AdFilter {
            category_id: Some(7),
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Bike");

        let filter = AdFilter {
            city_id: Some(2),
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].city_id, 2);
    }

    #[sqlx::test]
    async fn test_search_sort_by_price(pool: PgPool) {
        let user = seed_user(&pool, "sorter").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        repo.create(&ad_request(user.id, "Mid", 50, vec![])).await.unwrap();
        repo.create(&ad_request(user.id, "Cheap", 10, vec![])).await.unwrap();
        repo.create(&ad_request(user.id, "Pricey", 90, vec![])).await.unwrap();

        let filter = AdFilter {
            sort: Some(AdSortField::Price),
            order: SortOrder::Asc,
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        let titles: Vec<_> = results.iter().map(|ad| ad.title.as_str()).collect();
        assert_eq!(titles, vec!["Cheap", "Mid", "Pricey"]);

        let filter = AdFilter {
            sort: Some(AdSortField::Price),
            order: SortOrder::Desc,
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        let titles: Vec<_> = results.iter().map(|ad| ad.title.as_str()).collect();
        assert_eq!(titles, vec!["Pricey", "Mid", "Cheap"]);
    }

    #[sqlx::test]
    async fn test_update_owned_rejects_non_owner(pool: PgPool) {
        let owner = seed_user(&pool, "owner").await;
        let intruder = seed_user(&pool, "intruder").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let request = ad_request(owner.id, "Lamp", 25, vec![]);
        repo.create(&request).await.unwrap();

        let update = AdUpdateDBRequest {
            title: Some("Stolen lamp".to_string()),
            ..Default::default()
        };
        let err = repo.update_owned(request.id, intruder.id, &update).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));

        // A missing ad reports exactly the same error as a foreign one
        let err = repo.update_owned(Uuid::new_v4(), intruder.id, &update).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));

        // The owner succeeds, and untouched fields are preserved
        let updated = repo.update_owned(request.id, owner.id, &update).await.unwrap();
        assert_eq!(updated.title, "Stolen lamp");
        assert_eq!(updated.price, Decimal::from(25));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_owned_removes_photos_then_ad(pool: PgPool) {
        let owner = seed_user(&pool, "deleter").await;
        let other = seed_user(&pool, "bystander").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let request = ad_request(owner.id, "Desk", 70, vec!["ads/d/1-a.jpg".to_string(), "ads/d/2-b.jpg".to_string()]);
        repo.create(&request).await.unwrap();

        let err = repo.delete_owned(request.id, other.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));

        let removed = repo.delete_owned(request.id, owner.id).await.unwrap();
        assert_eq!(removed, vec!["ads/d/1-a.jpg", "ads/d/2-b.jpg"]);

        assert!(repo.get_by_id(request.id).await.unwrap().is_none());
        assert!(repo.photos_for_ad(request.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_mark_sold_is_ownership_gated_and_idempotent(pool: PgPool) {
        let owner = seed_user(&pool, "closer").await;
        let other = seed_user(&pool, "nosy").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        let request = ad_request(owner.id, "Guitar", 200, vec![]);
        repo.create(&request).await.unwrap();

        let err = repo.mark_sold(request.id, other.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));

        repo.mark_sold(request.id, owner.id).await.unwrap();
        let ad = repo.get_by_id(request.id).await.unwrap().unwrap();
        assert!(ad.is_sold);

        // Marking an already-sold ad again succeeds silently
        repo.mark_sold(request.id, owner.id).await.unwrap();
        let ad = repo.get_by_id(request.id).await.unwrap().unwrap();
        assert!(ad.is_sold);
    }

    #[sqlx::test]
    async fn test_pagination(pool: PgPool) {
        let user = seed_user(&pool, "paginator").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Ads::new(&mut conn);

        for i in 0..5 {
            repo.create(&ad_request(user.id, &format!("Item {i}"), 10 + i, vec![])).await.unwrap();
        }

        let filter = AdFilter {
            sort: Some(AdSortField::Price),
            order: SortOrder::Asc,
            skip: 2,
            limit: 2,
            ..Default::default()
        };
        let results = repo.list(&filter).await.unwrap();
        let titles: Vec<_> = results.iter().map(|ad| ad.title.as_str()).collect();
        assert_eq!(titles, vec!["Item 2", "Item 3"]);
    }
}

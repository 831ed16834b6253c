//! Read-only lookup of ad types.

use crate::db::errors::Result;
use crate::types::AdTypeId;
use sqlx::PgConnection;
use tracing::instrument;

pub struct AdTypes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AdTypes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Resolve a human-readable type name (e.g. "sale") to its id.
    #[instrument(skip(self), err)]
    pub async fn resolve(&mut self, name: &str) -> Result<Option<AdTypeId>> {
        let id = sqlx::query_scalar::<_, AdTypeId>("SELECT id FROM ad_types WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(id)
    }
}

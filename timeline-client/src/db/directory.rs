use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{CommunityDirectory, StoreError};

/// Read-only directory lookups. These never mutate, so they run on the pool
/// directly rather than on the caller's transaction.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommunityDirectory for PgDirectory {
    async fn operation_exists(&self, operation_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sharing_operations WHERE id = $1)")
                .bind(operation_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn meter_in_community(
        &self,
        ean: &str,
        community_id: Uuid,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM meters WHERE ean = $1 AND community_id = $2)",
        )
        .bind(ean)
        .bind(community_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

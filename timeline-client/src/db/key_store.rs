use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::{AllocationKeyPeriod, KeyStatus};
use crate::store::{AllocationKeyStore, StoreError};

#[async_trait]
impl AllocationKeyStore for PgConnection {
    async fn find_open(
        &mut self,
        operation_id: Uuid,
        status: KeyStatus,
    ) -> Result<Option<AllocationKeyPeriod>, StoreError> {
        let row = sqlx::query_as::<_, AllocationKeyPeriod>(
            r#"
            SELECT id, operation_id, key_version, start_date, end_date, status
            FROM allocation_key_periods
            WHERE operation_id = $1 AND status = $2 AND end_date IS NULL
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(operation_id)
        .bind(status)
        .fetch_optional(&mut *self)
        .await?;

        Ok(row)
    }

    async fn save(
        &mut self,
        mut entry: AllocationKeyPeriod,
    ) -> Result<AllocationKeyPeriod, StoreError> {
        match entry.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO allocation_key_periods
                        (operation_id, key_version, start_date, end_date, status)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(entry.operation_id)
                .bind(&entry.key_version)
                .bind(entry.start_date)
                .bind(entry.end_date)
                .bind(entry.status)
                .fetch_one(&mut *self)
                .await?;
                entry.id = Some(id);
            }
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE allocation_key_periods
                    SET key_version = $2, start_date = $3, end_date = $4, status = $5
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(&entry.key_version)
                .bind(entry.start_date)
                .bind(entry.end_date)
                .bind(entry.status)
                .execute(&mut *self)
                .await?;
            }
        }

        Ok(entry)
    }
}

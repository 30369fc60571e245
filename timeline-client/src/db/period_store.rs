use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgConnection;
use time::Date;
use uuid::Uuid;

use crate::domain::ConfigurationPeriod;
use crate::store::{PeriodStore, StoreError};

const PERIOD_COLUMNS: &str = "id, ean, start_date, end_date, status, holder, rate, \
     sharing_operation_id, client_type, injection, description";

/// [`PeriodStore`] directly on the transaction's connection: the caller
/// begins the transaction and passes `&mut *tx` down, so every engine
/// call is scoped to it by construction.
#[async_trait]
impl PeriodStore for PgConnection {
    async fn find_latest(&mut self, ean: &str) -> Result<Option<ConfigurationPeriod>, StoreError> {
        let row = sqlx::query_as::<_, ConfigurationPeriod>(&format!(
            r#"
            SELECT {PERIOD_COLUMNS}
            FROM configuration_periods
            WHERE ean = $1
            ORDER BY start_date DESC
            LIMIT 1
            "#
        ))
        .bind(ean)
        .fetch_optional(&mut *self)
        .await?;

        Ok(row)
    }

    async fn find_by_end_date(
        &mut self,
        ean: &str,
        end: Date,
    ) -> Result<Option<ConfigurationPeriod>, StoreError> {
        let row = sqlx::query_as::<_, ConfigurationPeriod>(&format!(
            r#"
            SELECT {PERIOD_COLUMNS}
            FROM configuration_periods
            WHERE ean = $1 AND end_date = $2
            "#
        ))
        .bind(ean)
        .bind(end)
        .fetch_optional(&mut *self)
        .await?;

        Ok(row)
    }

    async fn save(
        &mut self,
        mut period: ConfigurationPeriod,
    ) -> Result<ConfigurationPeriod, StoreError> {
        match period.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO configuration_periods
                        (ean, start_date, end_date, status, holder, rate,
                         sharing_operation_id, client_type, injection, description)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING id
                    "#,
                )
                .bind(&period.ean)
                .bind(period.start_date)
                .bind(period.end_date)
                .bind(period.status)
                .bind(&period.holder)
                .bind(&period.rate)
                .bind(period.sharing_operation_id)
                .bind(&period.client_type)
                .bind(period.injection)
                .bind(&period.description)
                .fetch_one(&mut *self)
                .await?;
                period.id = Some(id);
            }
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE configuration_periods
                    SET start_date = $2, end_date = $3, status = $4, holder = $5,
                        rate = $6, sharing_operation_id = $7, client_type = $8,
                        injection = $9, description = $10
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(period.start_date)
                .bind(period.end_date)
                .bind(period.status)
                .bind(&period.holder)
                .bind(&period.rate)
                .bind(period.sharing_operation_id)
                .bind(&period.client_type)
                .bind(period.injection)
                .bind(&period.description)
                .execute(&mut *self)
                .await?;
            }
        }

        Ok(period)
    }

    async fn delete(&mut self, period: &ConfigurationPeriod) -> Result<(), StoreError> {
        if let Some(id) = period.id {
            sqlx::query("DELETE FROM configuration_periods WHERE id = $1")
                .bind(id)
                .execute(&mut *self)
                .await?;
        }
        Ok(())
    }

    async fn eans_linked_to_operation(
        &mut self,
        operation_id: Uuid,
    ) -> Result<HashSet<String>, StoreError> {
        let eans: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT ean
            FROM configuration_periods
            WHERE sharing_operation_id = $1
            "#,
        )
        .bind(operation_id)
        .fetch_all(&mut *self)
        .await?;

        Ok(eans.into_iter().collect())
    }
}

//! Store traits consumed by the timeline engine, the lifecycle adapter and
//! the ingestion pipeline.
//!
//! A store instance is scoped to one transaction: in production the traits
//! are implemented on `PgConnection` (see [`crate::db`]) and the caller hands
//! its live transaction's connection down. Mutating methods take `&mut self`
//! so a store cannot be shared across concurrent writers by accident.

use std::collections::HashSet;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{
    AllocationKeyPeriod, ConfigurationPeriod, KeyStatus, MeterConsumption, OperationConsumption,
};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Primitive access to one meter's configuration periods. No business rules
/// live here; the timeline engine owns the invariants.
#[async_trait]
pub trait PeriodStore: Send {
    /// The period with the greatest `start_date` for this EAN.
    async fn find_latest(&mut self, ean: &str) -> Result<Option<ConfigurationPeriod>, StoreError>;

    /// The period whose `end_date` equals `end`, i.e. the direct predecessor
    /// of a period starting the day after.
    async fn find_by_end_date(
        &mut self,
        ean: &str,
        end: Date,
    ) -> Result<Option<ConfigurationPeriod>, StoreError>;

    /// Insert (id = None) or update (id = Some) and return the stored row.
    async fn save(&mut self, period: ConfigurationPeriod)
        -> Result<ConfigurationPeriod, StoreError>;

    async fn delete(&mut self, period: &ConfigurationPeriod) -> Result<(), StoreError>;

    /// Every EAN that has ever had a period referencing the operation,
    /// active or historical. This is the ingestion authorization set.
    async fn eans_linked_to_operation(
        &mut self,
        operation_id: Uuid,
    ) -> Result<HashSet<String>, StoreError>;
}

/// Access to the allocation-key timeline of a sharing operation.
#[async_trait]
pub trait AllocationKeyStore: Send {
    /// The open (`end_date = NULL`) entry with the given status, if any.
    async fn find_open(
        &mut self,
        operation_id: Uuid,
        status: KeyStatus,
    ) -> Result<Option<AllocationKeyPeriod>, StoreError>;

    async fn save(
        &mut self,
        entry: AllocationKeyPeriod,
    ) -> Result<AllocationKeyPeriod, StoreError>;
}

/// Time-series store for the two consumption record flavors.
#[async_trait]
pub trait ConsumptionStore: Send {
    /// Existing per-meter records for the given (ean, ts) keys.
    async fn find_meter_records(
        &mut self,
        keys: &[(String, OffsetDateTime)],
    ) -> Result<Vec<MeterConsumption>, StoreError>;

    /// Upsert operation-scoped records; one record per (operation, ts).
    async fn save_operation_batch(
        &mut self,
        records: &[OperationConsumption],
    ) -> Result<(), StoreError>;

    /// Upsert meter-scoped records; one record per (ean, ts).
    async fn save_meter_batch(&mut self, records: &[MeterConsumption]) -> Result<(), StoreError>;
}

/// Read-only lookups backing the lifecycle adapter's preconditions.
#[async_trait]
pub trait CommunityDirectory: Send + Sync {
    async fn operation_exists(&self, operation_id: Uuid) -> Result<bool, StoreError>;

    async fn meter_in_community(
        &self,
        ean: &str,
        community_id: Uuid,
    ) -> Result<bool, StoreError>;
}

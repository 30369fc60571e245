//! In-memory stores for unit tests. One [`MemStore`] plays the role the
//! transaction-scoped `PgConnection` plays in production: it implements
//! every store trait at once.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use timeline_client::domain::{
    AllocationKeyPeriod, ConfigurationPeriod, KeyStatus, MeterConsumption, OperationConsumption,
};
use timeline_client::store::{
    AllocationKeyStore, CommunityDirectory, ConsumptionStore, PeriodStore, StoreError,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemStore {
    pub periods: Vec<ConfigurationPeriod>,
    pub key_entries: Vec<AllocationKeyPeriod>,
    pub operation: BTreeMap<(Uuid, OffsetDateTime), OperationConsumption>,
    pub meter: BTreeMap<(String, OffsetDateTime), MeterConsumption>,
    /// Size of each meter batch as it was flushed, for chunking assertions.
    pub meter_batch_sizes: Vec<usize>,
    next_id: i64,
}

impl MemStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl PeriodStore for MemStore {
    async fn find_latest(&mut self, ean: &str) -> Result<Option<ConfigurationPeriod>, StoreError> {
        Ok(self
            .periods
            .iter()
            .filter(|p| p.ean == ean)
            .max_by_key(|p| p.start_date)
            .cloned())
    }

    async fn find_by_end_date(
        &mut self,
        ean: &str,
        end: Date,
    ) -> Result<Option<ConfigurationPeriod>, StoreError> {
        Ok(self
            .periods
            .iter()
            .find(|p| p.ean == ean && p.end_date == Some(end))
            .cloned())
    }

    async fn save(
        &mut self,
        mut period: ConfigurationPeriod,
    ) -> Result<ConfigurationPeriod, StoreError> {
        match period.id {
            Some(id) => {
                if let Some(existing) = self.periods.iter_mut().find(|p| p.id == Some(id)) {
                    *existing = period.clone();
                }
            }
            None => {
                period.id = Some(self.next_id());
                self.periods.push(period.clone());
            }
        }
        Ok(period)
    }

    async fn delete(&mut self, period: &ConfigurationPeriod) -> Result<(), StoreError> {
        self.periods.retain(|p| p.id != period.id);
        Ok(())
    }

    async fn eans_linked_to_operation(
        &mut self,
        operation_id: Uuid,
    ) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .periods
            .iter()
            .filter(|p| p.sharing_operation_id == Some(operation_id))
            .map(|p| p.ean.clone())
            .collect())
    }
}

#[async_trait]
impl AllocationKeyStore for MemStore {
    async fn find_open(
        &mut self,
        operation_id: Uuid,
        status: KeyStatus,
    ) -> Result<Option<AllocationKeyPeriod>, StoreError> {
        Ok(self
            .key_entries
            .iter()
            .find(|e| e.operation_id == operation_id && e.status == status && e.is_open())
            .cloned())
    }

    async fn save(
        &mut self,
        mut entry: AllocationKeyPeriod,
    ) -> Result<AllocationKeyPeriod, StoreError> {
        match entry.id {
            Some(id) => {
                if let Some(existing) = self.key_entries.iter_mut().find(|e| e.id == Some(id)) {
                    *existing = entry.clone();
                }
            }
            None => {
                entry.id = Some(self.next_id());
                self.key_entries.push(entry.clone());
            }
        }
        Ok(entry)
    }
}

#[async_trait]
impl ConsumptionStore for MemStore {
    async fn find_meter_records(
        &mut self,
        keys: &[(String, OffsetDateTime)],
    ) -> Result<Vec<MeterConsumption>, StoreError> {
        Ok(keys
            .iter()
            .filter_map(|k| self.meter.get(k).cloned())
            .collect())
    }

    async fn save_operation_batch(
        &mut self,
        records: &[OperationConsumption],
    ) -> Result<(), StoreError> {
        for r in records {
            self.operation.insert((r.operation_id, r.ts), r.clone());
        }
        Ok(())
    }

    async fn save_meter_batch(&mut self, records: &[MeterConsumption]) -> Result<(), StoreError> {
        self.meter_batch_sizes.push(records.len());
        for r in records {
            self.meter.insert((r.ean.clone(), r.ts), r.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemDirectory {
    pub operations: HashSet<Uuid>,
    pub meter_communities: HashMap<String, Uuid>,
}

#[async_trait]
impl CommunityDirectory for MemDirectory {
    async fn operation_exists(&self, operation_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.operations.contains(&operation_id))
    }

    async fn meter_in_community(
        &self,
        ean: &str,
        community_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.meter_communities.get(ean) == Some(&community_id))
    }
}

//! Translates sharing-operation domain actions into timeline mutations.
//!
//! Meter-grain actions (attach, detach, status change) delegate to the
//! timeline engine with the right field set; key-grain actions apply the
//! same close/open discipline to the operation's allocation-key timeline.
//! Preconditions live here, never in the engine.

use time::Date;
use timeline_client::domain::{
    AllocationKeyPeriod, ConfigurationPeriod, KeyStatus, Patch, PeriodPatch, PeriodStatus,
};
use timeline_client::store::{
    AllocationKeyStore, CommunityDirectory, PeriodStore, StoreError,
};
use uuid::Uuid;

use crate::timeline::{self, TimelineError};

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("sharing operation {0} does not exist")]
    OperationNotFound(Uuid),
    #[error("meter {ean} does not belong to community {community_id}")]
    MeterNotInCommunity { ean: String, community_id: Uuid },
    #[error("meter {ean} is not currently linked to sharing operation {operation_id}")]
    NotLinked { ean: String, operation_id: Uuid },
    #[error("sharing operation {0} has no pending allocation key")]
    NoPendingKey(Uuid),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn day_before(date: Date) -> Date {
    date.previous_day().unwrap_or(Date::MIN)
}

async fn check_operation_and_community<D: CommunityDirectory>(
    directory: &D,
    operation_id: Uuid,
    ean: &str,
    community_id: Uuid,
) -> Result<(), LifecycleError> {
    if !directory.operation_exists(operation_id).await? {
        return Err(LifecycleError::OperationNotFound(operation_id));
    }
    if !directory.meter_in_community(ean, community_id).await? {
        return Err(LifecycleError::MeterNotInCommunity {
            ean: ean.to_string(),
            community_id,
        });
    }
    Ok(())
}

/// The meter's current (latest) period must reference `operation_id`; a
/// mismatch is reported, not silently ignored.
async fn check_currently_linked<P: PeriodStore>(
    periods: &mut P,
    ean: &str,
    operation_id: Uuid,
) -> Result<(), LifecycleError> {
    let latest = periods.find_latest(ean).await?;
    let linked = latest
        .as_ref()
        .map_or(false, |p| p.sharing_operation_id == Some(operation_id));
    if !linked {
        return Err(LifecycleError::NotLinked {
            ean: ean.to_string(),
            operation_id,
        });
    }
    Ok(())
}

/// Open a new period linking the meter to the operation, awaiting approval.
pub async fn attach_meter<P: PeriodStore, D: CommunityDirectory>(
    periods: &mut P,
    directory: &D,
    community_id: Uuid,
    operation_id: Uuid,
    ean: &str,
    date: Date,
) -> Result<ConfigurationPeriod, LifecycleError> {
    check_operation_and_community(directory, operation_id, ean, community_id).await?;

    let patch = PeriodPatch {
        status: Some(PeriodStatus::AwaitingApproval),
        sharing_operation_id: Patch::Set(operation_id),
        ..PeriodPatch::default()
    };
    let period = timeline::insert_period(periods, ean, date, patch).await?;
    tracing::info!(%operation_id, ean, %date, "meter attached to sharing operation");
    Ok(period)
}

/// Open a new period with the sharing link cleared and the meter inactive.
pub async fn detach_meter<P: PeriodStore, D: CommunityDirectory>(
    periods: &mut P,
    directory: &D,
    community_id: Uuid,
    operation_id: Uuid,
    ean: &str,
    date: Date,
) -> Result<ConfigurationPeriod, LifecycleError> {
    check_operation_and_community(directory, operation_id, ean, community_id).await?;
    check_currently_linked(periods, ean, operation_id).await?;

    let patch = PeriodPatch {
        status: Some(PeriodStatus::Inactive),
        sharing_operation_id: Patch::Unset,
        ..PeriodPatch::default()
    };
    let period = timeline::insert_period(periods, ean, date, patch).await?;
    tracing::info!(%operation_id, ean, %date, "meter detached from sharing operation");
    Ok(period)
}

/// Change the meter's status from `date` on; every other field is inherited.
pub async fn patch_meter_status<P: PeriodStore, D: CommunityDirectory>(
    periods: &mut P,
    directory: &D,
    community_id: Uuid,
    operation_id: Uuid,
    ean: &str,
    date: Date,
    status: PeriodStatus,
) -> Result<ConfigurationPeriod, LifecycleError> {
    check_operation_and_community(directory, operation_id, ean, community_id).await?;
    check_currently_linked(periods, ean, operation_id).await?;

    let period = timeline::insert_period(periods, ean, date, PeriodPatch::status(status)).await?;
    Ok(period)
}

/// Approve an allocation key version from `date` on.
///
/// Closes the currently approved entry (at most one approved key is active
/// at a time) and the pending entry being promoted, then opens a new
/// approved entry.
pub async fn approve_key<K: AllocationKeyStore>(
    keys: &mut K,
    operation_id: Uuid,
    key_version: &str,
    date: Date,
) -> Result<AllocationKeyPeriod, LifecycleError> {
    if let Some(mut approved) = keys.find_open(operation_id, KeyStatus::Approved).await? {
        approved.end_date = Some(day_before(date));
        keys.save(approved).await?;
    }
    if let Some(mut pending) = keys.find_open(operation_id, KeyStatus::Pending).await? {
        pending.end_date = Some(day_before(date));
        keys.save(pending).await?;
    }

    let entry = keys
        .save(AllocationKeyPeriod {
            id: None,
            operation_id,
            key_version: key_version.to_string(),
            start_date: date,
            end_date: None,
            status: KeyStatus::Approved,
        })
        .await?;
    tracing::info!(%operation_id, key_version, %date, "allocation key approved");
    Ok(entry)
}

/// Reject the pending allocation key by closing its entry at `date - 1`.
pub async fn reject_key<K: AllocationKeyStore>(
    keys: &mut K,
    operation_id: Uuid,
    date: Date,
) -> Result<AllocationKeyPeriod, LifecycleError> {
    let Some(mut pending) = keys.find_open(operation_id, KeyStatus::Pending).await? else {
        return Err(LifecycleError::NoPendingKey(operation_id));
    };

    pending.end_date = Some(day_before(date));
    let entry = keys.save(pending).await?;
    tracing::info!(%operation_id, %date, "allocation key rejected");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemDirectory, MemStore};
    use time::macros::date;

    fn directory(op: Uuid, ean: &str, community: Uuid) -> MemDirectory {
        let mut dir = MemDirectory::default();
        dir.operations.insert(op);
        dir.meter_communities.insert(ean.to_string(), community);
        dir
    }

    #[tokio::test]
    async fn attach_then_detach_round_trip() {
        let mut periods = MemStore::default();
        let op = Uuid::new_v4();
        let community = Uuid::new_v4();
        let dir = directory(op, "ean-1", community);

        let attached = attach_meter(
            &mut periods,
            &dir,
            community,
            op,
            "ean-1",
            date!(2024 - 01 - 01),
        )
        .await
        .unwrap();
        assert_eq!(attached.status, PeriodStatus::AwaitingApproval);
        assert_eq!(attached.sharing_operation_id, Some(op));

        let detached = detach_meter(
            &mut periods,
            &dir,
            community,
            op,
            "ean-1",
            date!(2024 - 06 - 01),
        )
        .await
        .unwrap();
        assert_eq!(detached.status, PeriodStatus::Inactive);
        assert_eq!(detached.sharing_operation_id, None);

        // the attach period was closed the day before
        assert_eq!(periods.periods[0].end_date, Some(date!(2024 - 05 - 31)));
    }

    #[tokio::test]
    async fn attach_to_unknown_operation_is_rejected() {
        let mut periods = MemStore::default();
        let community = Uuid::new_v4();
        let dir = directory(Uuid::new_v4(), "ean-1", community);

        let unknown = Uuid::new_v4();
        let err = attach_meter(
            &mut periods,
            &dir,
            community,
            unknown,
            "ean-1",
            date!(2024 - 01 - 01),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::OperationNotFound(id) if id == unknown));
    }

    #[tokio::test]
    async fn attach_requires_meter_in_community() {
        let mut periods = MemStore::default();
        let op = Uuid::new_v4();
        let dir = directory(op, "ean-1", Uuid::new_v4());

        let other_community = Uuid::new_v4();
        let err = attach_meter(
            &mut periods,
            &dir,
            other_community,
            op,
            "ean-1",
            date!(2024 - 01 - 01),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::MeterNotInCommunity { .. }));
    }

    #[tokio::test]
    async fn detach_reports_mismatched_operation() {
        let mut periods = MemStore::default();
        let op = Uuid::new_v4();
        let other_op = Uuid::new_v4();
        let community = Uuid::new_v4();
        let mut dir = directory(op, "ean-1", community);
        dir.operations.insert(other_op);

        attach_meter(
            &mut periods,
            &dir,
            community,
            op,
            "ean-1",
            date!(2024 - 01 - 01),
        )
        .await
        .unwrap();

        let err = detach_meter(
            &mut periods,
            &dir,
            community,
            other_op,
            "ean-1",
            date!(2024 - 06 - 01),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::NotLinked { .. }));
    }

    #[tokio::test]
    async fn patch_status_inherits_the_sharing_link() {
        let mut periods = MemStore::default();
        let op = Uuid::new_v4();
        let community = Uuid::new_v4();
        let dir = directory(op, "ean-1", community);

        attach_meter(
            &mut periods,
            &dir,
            community,
            op,
            "ean-1",
            date!(2024 - 01 - 01),
        )
        .await
        .unwrap();

        let approved = patch_meter_status(
            &mut periods,
            &dir,
            community,
            op,
            "ean-1",
            date!(2024 - 02 - 01),
            PeriodStatus::Approved,
        )
        .await
        .unwrap();
        assert_eq!(approved.status, PeriodStatus::Approved);
        assert_eq!(approved.sharing_operation_id, Some(op));
    }

    #[tokio::test]
    async fn approve_closes_the_previous_approved_key() {
        let mut keys = MemStore::default();
        let op = Uuid::new_v4();

        approve_key(&mut keys, op, "v1", date!(2024 - 01 - 01))
            .await
            .unwrap();
        let v2 = approve_key(&mut keys, op, "v2", date!(2024 - 06 - 01))
            .await
            .unwrap();

        assert_eq!(keys.key_entries.len(), 2);
        let v1 = &keys.key_entries[0];
        assert_eq!(v1.end_date, Some(date!(2024 - 05 - 31)));
        assert_eq!(v2.end_date, None);
        assert_eq!(v2.status, KeyStatus::Approved);

        let open_approved: Vec<_> = keys
            .key_entries
            .iter()
            .filter(|e| e.status == KeyStatus::Approved && e.is_open())
            .collect();
        assert_eq!(open_approved.len(), 1);
    }

    #[tokio::test]
    async fn approve_also_closes_the_pending_entry() {
        let mut keys = MemStore::default();
        let op = Uuid::new_v4();
        AllocationKeyStore::save(&mut keys, AllocationKeyPeriod {
            id: None,
            operation_id: op,
            key_version: "v1".to_string(),
            start_date: date!(2024 - 01 - 01),
            end_date: None,
            status: KeyStatus::Pending,
        })
        .await
        .unwrap();

        approve_key(&mut keys, op, "v1", date!(2024 - 03 - 01))
            .await
            .unwrap();

        let pending = &keys.key_entries[0];
        assert_eq!(pending.end_date, Some(date!(2024 - 02 - 29)));
    }

    #[tokio::test]
    async fn reject_requires_a_pending_entry() {
        let mut keys = MemStore::default();
        let op = Uuid::new_v4();
        let err = reject_key(&mut keys, op, date!(2024 - 01 - 01))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NoPendingKey(id) if id == op));
    }

    #[tokio::test]
    async fn reject_closes_the_pending_entry() {
        let mut keys = MemStore::default();
        let op = Uuid::new_v4();
        AllocationKeyStore::save(&mut keys, AllocationKeyPeriod {
            id: None,
            operation_id: op,
            key_version: "v1".to_string(),
            start_date: date!(2024 - 01 - 01),
            end_date: None,
            status: KeyStatus::Pending,
        })
        .await
        .unwrap();

        let closed = reject_key(&mut keys, op, date!(2024 - 04 - 01)).await.unwrap();
        assert_eq!(closed.end_date, Some(date!(2024 - 03 - 31)));
    }
}

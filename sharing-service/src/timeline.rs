//! The timeline engine: inserts and removes configuration periods for one
//! meter while preserving the no-overlap / single-open-period invariants.
//!
//! Every call runs against a [`PeriodStore`] scoped to the caller's
//! transaction, so the close-then-open and delete-then-heal sequences either
//! commit together or not at all.

use time::Date;
use timeline_client::domain::{ConfigurationPeriod, PeriodPatch, PeriodStatus};
use timeline_client::store::{PeriodStore, StoreError};

#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    #[error("a period for meter {ean} already starts at {existing_start} which is after {requested}")]
    Conflict {
        ean: String,
        requested: Date,
        existing_start: Date,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of [`remove_period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealOutcome {
    /// The predecessor was extended over the hole left by the deletion.
    Healed,
    /// Healing was requested but no period ends the day before the removed
    /// one started. The gap persists; this is not an error.
    NoPredecessor,
    /// The caller did not ask for healing.
    NotRequested,
}

fn day_before(date: Date) -> Date {
    date.previous_day().unwrap_or(Date::MIN)
}

/// Insert a new configuration period starting at `start_date`.
///
/// The new period is open-ended and inherits every field the patch does not
/// provide from the latest existing period, so callers only state what
/// changes. Four cases:
///
/// - empty timeline: a fresh open period, status defaulting to
///   [`PeriodStatus::AwaitingApproval`];
/// - `start_date` equals the latest period's start: the patch is merged into
///   that period in place (same-day correction, no new row);
/// - the latest period starts after `start_date`:
///   [`TimelineError::Conflict`] — retroactive insertion is rejected;
/// - otherwise the latest period, if open or overlapping, is closed at
///   `start_date - 1` and the new period opened at `start_date`.
pub async fn insert_period<S: PeriodStore>(
    store: &mut S,
    ean: &str,
    start_date: Date,
    patch: PeriodPatch,
) -> Result<ConfigurationPeriod, TimelineError> {
    let Some(mut latest) = store.find_latest(ean).await? else {
        let period = ConfigurationPeriod {
            id: None,
            ean: ean.to_string(),
            start_date,
            end_date: None,
            status: patch.status.unwrap_or_default(),
            holder: patch.holder.apply(None),
            rate: patch.rate.apply(None),
            sharing_operation_id: patch.sharing_operation_id.apply(None),
            client_type: patch.client_type.apply(None),
            injection: patch.injection.apply(None),
            description: patch.description.apply(None),
        };
        return Ok(store.save(period).await?);
    };

    if latest.start_date == start_date {
        // Same-day correction: merge into the existing row.
        latest.apply_patch(patch);
        return Ok(store.save(latest).await?);
    }

    if latest.start_date > start_date {
        return Err(TimelineError::Conflict {
            ean: ean.to_string(),
            requested: start_date,
            existing_start: latest.start_date,
        });
    }

    // Close the latest period if it would overlap the new one.
    if latest.end_date.map_or(true, |end| end >= start_date) {
        latest.end_date = Some(day_before(start_date));
        latest = store.save(latest).await?;
    }

    let period = ConfigurationPeriod {
        id: None,
        ean: ean.to_string(),
        start_date,
        end_date: None,
        status: patch.status.unwrap_or(latest.status),
        holder: patch.holder.apply(latest.holder),
        rate: patch.rate.apply(latest.rate),
        sharing_operation_id: patch.sharing_operation_id.apply(latest.sharing_operation_id),
        client_type: patch.client_type.apply(latest.client_type),
        injection: patch.injection.apply(latest.injection),
        description: patch.description.apply(latest.description),
    };
    Ok(store.save(period).await?)
}

/// Delete `period`, optionally extending its direct predecessor over the
/// resulting hole.
///
/// The predecessor is the period ending exactly the day before `period`
/// started; when found, its `end_date` takes over the removed period's
/// `end_date` so the timeline stays gapless at that boundary. Without
/// `heal_gap`, or when no predecessor exists, the gap persists.
pub async fn remove_period<S: PeriodStore>(
    store: &mut S,
    period: &ConfigurationPeriod,
    heal_gap: bool,
) -> Result<HealOutcome, TimelineError> {
    store.delete(period).await?;

    if !heal_gap {
        return Ok(HealOutcome::NotRequested);
    }

    let boundary = day_before(period.start_date);
    match store.find_by_end_date(&period.ean, boundary).await? {
        Some(mut predecessor) => {
            predecessor.end_date = period.end_date;
            store.save(predecessor).await?;
            Ok(HealOutcome::Healed)
        }
        None => {
            tracing::debug!(ean = %period.ean, %boundary, "no predecessor to heal");
            Ok(HealOutcome::NoPredecessor)
        }
    }
}

use time::Date;
use uuid::Uuid;

use super::Patch;

/// Lifecycle status of a meter's configuration within a sharing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "period_status", rename_all = "snake_case")]
pub enum PeriodStatus {
    #[default]
    AwaitingApproval,
    Approved,
    Rejected,
    Inactive,
}

/// One time-bounded configuration record for a meter, keyed by EAN.
///
/// For a fixed EAN the periods form a timeline: non-overlapping
/// `[start_date, end_date]` ranges (an open period has `end_date = None` and
/// counts as unbounded), with at most one open period at a time.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ConfigurationPeriod {
    /// `None` until the store assigns an id on first save.
    pub id: Option<i64>,
    pub ean: String,
    pub start_date: Date,
    /// Inclusive; `None` means the period is currently in effect.
    pub end_date: Option<Date>,
    pub status: PeriodStatus,
    pub holder: Option<String>,
    pub rate: Option<String>,
    pub sharing_operation_id: Option<Uuid>,
    pub client_type: Option<String>,
    pub injection: Option<bool>,
    pub description: Option<String>,
}

impl ConfigurationPeriod {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether this period covers `date` (open end counts as unbounded).
    pub fn covers(&self, date: Date) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| end >= date)
    }

    /// Overwrite this period's fields with the patch, in place. Fields the
    /// patch keeps are left untouched. Used for the same-day correction path.
    pub fn apply_patch(&mut self, patch: PeriodPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.holder = patch.holder.apply(self.holder.take());
        self.rate = patch.rate.apply(self.rate.take());
        self.sharing_operation_id = patch.sharing_operation_id.apply(self.sharing_operation_id);
        self.client_type = patch.client_type.apply(self.client_type.take());
        self.injection = patch.injection.apply(self.injection);
        self.description = patch.description.apply(self.description.take());
    }
}

/// Partial update over the configuration fields of a period.
///
/// `status` has no `Unset`: a period always carries a status, so the only
/// choice is "provide one" or "inherit".
#[derive(Debug, Clone, Default)]
pub struct PeriodPatch {
    pub status: Option<PeriodStatus>,
    pub holder: Patch<String>,
    pub rate: Patch<String>,
    pub sharing_operation_id: Patch<Uuid>,
    pub client_type: Patch<String>,
    pub injection: Patch<bool>,
    pub description: Patch<String>,
}

impl PeriodPatch {
    pub fn status(status: PeriodStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

use time::Date;
use uuid::Uuid;

/// Approval state of an allocation key version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "key_status", rename_all = "snake_case")]
pub enum KeyStatus {
    Pending,
    Approved,
    Rejected,
}

/// One entry of the allocation-key timeline of a sharing operation.
///
/// Same close/open discipline as the meter timeline, keyed by the operation
/// rather than an EAN, with the extra rule that at most one `Approved` entry
/// is open at any time.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AllocationKeyPeriod {
    pub id: Option<i64>,
    pub operation_id: Uuid,
    pub key_version: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status: KeyStatus,
}

impl AllocationKeyPeriod {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

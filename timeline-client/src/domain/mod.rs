mod allocation_key;
mod consumption;
mod patch;
mod period;

pub use allocation_key::{AllocationKeyPeriod, KeyStatus};
pub use consumption::{
    ConsumptionVector, Direction, MeterConsumption, OperationConsumption, ValueKind,
};
pub use patch::Patch;
pub use period::{ConfigurationPeriod, PeriodPatch, PeriodStatus};

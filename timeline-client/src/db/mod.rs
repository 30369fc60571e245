//! Postgres implementations of the store traits.
//!
//! [`PeriodStore`](crate::store::PeriodStore),
//! [`AllocationKeyStore`](crate::store::AllocationKeyStore) and
//! [`ConsumptionStore`](crate::store::ConsumptionStore) are implemented
//! directly on [`sqlx::PgConnection`], so a caller that began a transaction
//! hands `&mut *tx` to the engine and every statement runs inside it.

mod consumption_store;
mod directory;
mod key_store;
mod period_store;

pub use directory::PgDirectory;

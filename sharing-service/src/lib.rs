pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod observability;
pub mod timeline;
pub mod workbook;

#[cfg(test)]
pub mod testing;

pub use ingest::{ingest, IngestError, IngestSummary};
pub use lifecycle::LifecycleError;
pub use timeline::{insert_period, remove_period, HealOutcome, TimelineError};

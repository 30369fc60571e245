pub mod db;
pub mod domain;
pub mod store;

pub use store::StoreError;

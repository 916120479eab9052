//! The behaviour contracts a storage backend must fulfil to drive the marketplace gateway.
//!
//! [`MarketplaceDatabase`] covers the order mirroring flows; [`CatalogManagement`] covers product mirroring and
//! store teardown. `SqliteDatabase` implements both.
mod catalog_management;
mod marketplace_database;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use marketplace_database::{MarketplaceDatabase, OrderFlowError};

//! Marketplace Engine
//!
//! The engine owns everything the webhook processor persists: stores, mirrored order pairs, bundles and their
//! variant mappings, mirrored merchant catalogs, packaging box inventory, coupons, buyers and notifications.
//!
//! The crate is divided into two main sections:
//! 1. Database management ([`mod@sqlite`]). SQLite is the only backend at present. Consumers should not reach into
//!    the query modules directly; the data types in [`db_types`] are public, the SQL is not.
//! 2. The engine public API ([`mod@mpe_api`]). [`OrderSyncApi`] drives the order mirroring flows (create both sides
//!    atomically, mark paid, cancel, fulfill) and [`CatalogApi`] drives product mirroring and store teardown. Any
//!    backend that implements the traits in [`traits`] can sit behind these APIs.
//!
//! The engine also emits events when order pairs are created or annulled. A small actor framework in [`events`]
//! lets the processor hook into these to fan out notifications without coupling the flows to their side effects.
pub mod db_types;
pub mod events;
mod mpe_api;
mod sqlite;
pub mod traits;

pub use mpe_api::{CatalogApi, OrderSyncApi};
pub use sqlite::SqliteDatabase;

use thiserror::Error;

use crate::db_types::{Bundle, CatalogPurge, Coupon, NewProduct, Product, Store};

/// Storage behaviour for the mirrored merchant catalogs and for app-uninstall teardown.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    /// Inserts a mirrored product and its variants. Fails with [`CatalogError::ProductAlreadyExists`] when the
    /// product gid is already mirrored for the store (webhook redeliveries hit this path).
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Inserts the product, or replaces the existing mirror (including its variant rows) in one transaction.
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    async fn fetch_product(&self, store_id: i64, product_gid: &str) -> Result<Option<Product>, CatalogError>;

    /// All bundles of a store that are still live (not deleted, not temporary staging entries).
    async fn fetch_live_bundles(&self, store_id: i64) -> Result<Vec<Bundle>, CatalogError>;

    async fn fetch_coupons(&self, store_id: i64) -> Result<Vec<Coupon>, CatalogError>;

    async fn mark_coupon_deleted(&self, coupon_id: i64) -> Result<(), CatalogError>;

    /// Removes the store's mirrored products, their variants, and its box inventory. Returns the removed row
    /// counts.
    async fn purge_store_catalog(&self, store_id: i64) -> Result<CatalogPurge, CatalogError>;

    /// Flags the store inactive and returns the updated record.
    async fn deactivate_store(&self, store_id: i64) -> Result<Store, CatalogError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} is already mirrored for this store")]
    ProductAlreadyExists(String),
    #[error("Store with id {0} was not found")]
    StoreNotFound(i64),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

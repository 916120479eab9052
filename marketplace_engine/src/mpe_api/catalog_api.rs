use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Bundle, CatalogPurge, Coupon, NewProduct, Product, Store},
    traits::{CatalogError, CatalogManagement},
};

/// `CatalogApi` drives the mirrored merchant catalogs: product create/update webhooks land here, and so does the
/// teardown when a store uninstalls the app.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B: Clone> Clone for CatalogApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let record = self.db.insert_product(product).await?;
        info!("🛒️ Mirrored new product {} for store {}", record.product_id, record.store_id);
        Ok(record)
    }

    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let record = self.db.upsert_product(product).await?;
        info!("🛒️ Refreshed product mirror {} for store {}", record.product_id, record.store_id);
        Ok(record)
    }

    pub async fn fetch_product(&self, store_id: i64, product_gid: &str) -> Result<Option<Product>, CatalogError> {
        self.db.fetch_product(store_id, product_gid).await
    }

    pub async fn live_bundles(&self, store_id: i64) -> Result<Vec<Bundle>, CatalogError> {
        self.db.fetch_live_bundles(store_id).await
    }

    pub async fn coupons(&self, store_id: i64) -> Result<Vec<Coupon>, CatalogError> {
        self.db.fetch_coupons(store_id).await
    }

    pub async fn mark_coupon_deleted(&self, coupon_id: i64) -> Result<(), CatalogError> {
        self.db.mark_coupon_deleted(coupon_id).await
    }

    pub async fn purge_store_catalog(&self, store_id: i64) -> Result<CatalogPurge, CatalogError> {
        self.db.purge_store_catalog(store_id).await
    }

    pub async fn deactivate_store(&self, store_id: i64) -> Result<Store, CatalogError> {
        let store = self.db.deactivate_store(store_id).await?;
        info!("🛒️ Store {} ({}) deactivated", store.id, store.store_url);
        Ok(store)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

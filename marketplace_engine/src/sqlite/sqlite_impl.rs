//! `SqliteDatabase` is the concrete storage backend for the marketplace gateway.
//!
//! Unsurprisingly, it uses SQLite and implements the traits defined in the [`crate::traits`] module. All multi-row
//! flows (the dual order write, paired status transitions, product upserts, store teardown) run inside a single
//! transaction on the pool.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{bundles, coupons, new_pool, notifications, orders, products, store_boxes, stores, users};
use crate::{
    db_types::{
        Bundle,
        CatalogPurge,
        Coupon,
        FulfillmentUpdate,
        MirroredOrders,
        NewMirroredOrder,
        NewNotification,
        NewProduct,
        NewUser,
        Notification,
        Order,
        OrderId,
        PaymentStatusType,
        Product,
        Store,
        StoreBoxInventory,
        User,
    },
    traits::{CatalogError, CatalogManagement, MarketplaceDatabase, OrderFlowError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// An in-memory database. A single connection keeps every handle on the same memory store; used by tests.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        Self::new_with_url("sqlite::memory:", 1).await
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_marketplace_store(&self) -> Result<Store, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        stores::marketplace_store(&mut conn).await
    }

    async fn fetch_store_by_url(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stores::store_by_url(store_url, &mut conn).await?)
    }

    async fn fetch_active_store(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stores::active_store_by_url(store_url, &mut conn).await?)
    }

    async fn fetch_store_by_id(&self, store_id: i64) -> Result<Option<Store>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stores::store_by_id(store_id, &mut conn).await?)
    }

    async fn order_exists(&self, order_id: &OrderId) -> Result<Option<i64>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::order_exists(order_id, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn upsert_user(&self, user: NewUser) -> Result<User, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::upsert_user(user, &mut conn).await?)
    }

    async fn fetch_bundle_by_product_id(&self, product_gid: &str) -> Result<Option<Bundle>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bundles::bundle_by_product_id(product_gid, &mut conn).await?)
    }

    async fn fetch_variant_mapping(
        &self,
        bundle_id: i64,
        marketplace_variant_id: &str,
    ) -> Result<Option<String>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bundles::variant_mapping(bundle_id, marketplace_variant_id, &mut conn).await?)
    }

    async fn fetch_box_inventory(&self, store_id: i64) -> Result<Vec<StoreBoxInventory>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(store_boxes::box_inventory_for_store(store_id, &mut conn).await?)
    }

    async fn insert_mirrored_order(&self, order: NewMirroredOrder) -> Result<MirroredOrders, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        // Any remote id already present means the webhook is a redelivery; nothing is written.
        if orders::order_exists(&order.marketplace_order.order_id, &mut tx).await?.is_some() {
            return Err(OrderFlowError::OrderAlreadyExists(order.marketplace_order.order_id));
        }
        for merchant in &order.merchant_orders {
            if orders::order_exists(&merchant.order.order_id, &mut tx).await?.is_some() {
                return Err(OrderFlowError::OrderAlreadyExists(merchant.order.order_id.clone()));
            }
        }
        let all_bundles = order.all_bundles();
        let marketplace = orders::insert_order(order.marketplace_order, &mut tx).await?;
        orders::insert_bundle_lines(marketplace.id, &all_bundles, &mut tx).await?;
        let mut merchants = Vec::with_capacity(order.merchant_orders.len());
        for merchant in order.merchant_orders {
            let record = orders::insert_order(merchant.order, &mut tx).await?;
            orders::insert_bundle_lines(record.id, &merchant.bundles, &mut tx).await?;
            for line in &merchant.bundles {
                bundles::decrement_inventory(line.bundle_id, line.quantity, &mut tx).await?;
                if let Some(store_box_id) = line.store_box_id {
                    store_boxes::consume_box(store_box_id, line.quantity, &mut tx).await?;
                }
            }
            merchants.push(record);
        }
        tx.commit().await?;
        debug!(
            "🗃️ Mirrored order saved: marketplace [{}] with {} merchant order(s)",
            marketplace.order_id,
            merchants.len()
        );
        Ok(MirroredOrders { marketplace_order: marketplace, merchant_orders: merchants })
    }

    async fn mark_order_pair_paid(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
    ) -> Result<(Order, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let merchant = orders::update_payment_status(merchant, PaymentStatusType::Paid, &mut tx).await?;
        let marketplace = orders::update_payment_status(marketplace, PaymentStatusType::Paid, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order pair [{}] / [{}] marked as paid", merchant.order_id, marketplace.order_id);
        Ok((merchant, marketplace))
    }

    async fn cancel_order_pair(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
        cancelled_at: DateTime<Utc>,
    ) -> Result<(Order, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let merchant = orders::cancel_order(merchant, cancelled_at, &mut tx).await?;
        let marketplace = orders::cancel_order(marketplace, cancelled_at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order pair [{}] / [{}] cancelled", merchant.order_id, marketplace.order_id);
        Ok((merchant, marketplace))
    }

    async fn fulfill_order_pair(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
        update: FulfillmentUpdate,
    ) -> Result<(Order, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let merchant = orders::fulfill_order(merchant, &update, &mut tx).await?;
        let marketplace = orders::fulfill_order(marketplace, &update, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order pair [{}] / [{}] fulfilled", merchant.order_id, marketplace.order_id);
        Ok((merchant, marketplace))
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::insert_notification(notification, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let record = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let record = products::upsert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn fetch_product(&self, store_id: i64, product_gid: &str) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::product_by_gid(store_id, product_gid, &mut conn).await?)
    }

    async fn fetch_live_bundles(&self, store_id: i64) -> Result<Vec<Bundle>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(bundles::live_bundles_for_store(store_id, &mut conn).await?)
    }

    async fn fetch_coupons(&self, store_id: i64) -> Result<Vec<Coupon>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::coupons_for_store(store_id, &mut conn).await?)
    }

    async fn mark_coupon_deleted(&self, coupon_id: i64) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::mark_deleted(coupon_id, &mut conn).await?)
    }

    async fn purge_store_catalog(&self, store_id: i64) -> Result<CatalogPurge, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let (products, variants) = products::delete_for_store(store_id, &mut tx).await?;
        let store_boxes = store_boxes::delete_for_store(store_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Purged catalog for store {store_id}: {products} products, {variants} variants, {store_boxes} box rows");
        Ok(CatalogPurge { products, variants, store_boxes })
    }

    async fn deactivate_store(&self, store_id: i64) -> Result<Store, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::deactivate_store(store_id, &mut conn).await?;
        store.ok_or(CatalogError::StoreNotFound(store_id))
    }
}

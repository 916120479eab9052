use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{
        Bundle,
        FulfillmentUpdate,
        MirroredOrders,
        NewMirroredOrder,
        NewNotification,
        NewUser,
        Notification,
        Order,
        OrderId,
        Store,
        StoreBoxInventory,
        User,
    },
    events::{EventProducers, OrderAnnulledEvent, OrderMirroredEvent},
    traits::{MarketplaceDatabase, OrderFlowError},
};

/// `OrderSyncApi` is the primary API for mirroring marketplace orders onto merchant stores and keeping the two
/// sides' payment and fulfillment state in step.
pub struct OrderSyncApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderSyncApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderSyncApi")
    }
}

impl<B: Clone> Clone for OrderSyncApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> OrderSyncApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderSyncApi<B>
where B: MarketplaceDatabase
{
    /// The single active, internal storefront that aggregates shopper orders.
    pub async fn marketplace_store(&self) -> Result<Store, OrderFlowError> {
        self.db.fetch_marketplace_store().await
    }

    pub async fn store_by_url(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError> {
        self.db.fetch_store_by_url(store_url).await
    }

    pub async fn active_store(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError> {
        self.db.fetch_active_store(store_url).await
    }

    pub async fn store_by_id(&self, store_id: i64) -> Result<Option<Store>, OrderFlowError> {
        self.db.fetch_store_by_id(store_id).await
    }

    pub async fn order_exists(&self, order_id: &OrderId) -> Result<Option<i64>, OrderFlowError> {
        self.db.order_exists(order_id).await
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    /// Fetches an order and resolves its counterpart reference, for the flows that must touch both sides.
    /// A missing counterpart reference is a data-inconsistency error, not a not-found.
    pub async fn fetch_order_with_counterpart(&self, order_id: &OrderId) -> Result<(Order, OrderId), OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let counterpart =
            order.counterpart_order_id.clone().ok_or_else(|| OrderFlowError::MissingCounterpart(order_id.clone()))?;
        Ok((order, counterpart))
    }

    pub async fn upsert_user(&self, user: NewUser) -> Result<User, OrderFlowError> {
        self.db.upsert_user(user).await
    }

    pub async fn bundle_by_product_id(&self, product_gid: &str) -> Result<Option<Bundle>, OrderFlowError> {
        self.db.fetch_bundle_by_product_id(product_gid).await
    }

    pub async fn variant_mapping(
        &self,
        bundle_id: i64,
        marketplace_variant_id: &str,
    ) -> Result<Option<String>, OrderFlowError> {
        self.db.fetch_variant_mapping(bundle_id, marketplace_variant_id).await
    }

    pub async fn box_inventory(&self, store_id: i64) -> Result<Vec<StoreBoxInventory>, OrderFlowError> {
        self.db.fetch_box_inventory(store_id).await
    }

    /// Commits a mirrored order atomically and notifies the order-mirrored hook subscribers, once per merchant
    /// order created.
    pub async fn process_mirrored_order(&self, order: NewMirroredOrder) -> Result<MirroredOrders, OrderFlowError> {
        let mirrored = self.db.insert_mirrored_order(order).await?;
        debug!(
            "🔄️📦️ Order [{}] mirrored onto {} merchant store(s)",
            mirrored.marketplace_order.order_id,
            mirrored.merchant_orders.len()
        );
        for merchant in &mirrored.merchant_orders {
            self.call_order_mirrored_hook(merchant, &mirrored.marketplace_order).await;
        }
        Ok(mirrored)
    }

    pub async fn mark_order_pair_paid(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
    ) -> Result<(Order, Order), OrderFlowError> {
        let result = self.db.mark_order_pair_paid(merchant, marketplace).await?;
        debug!("🔄️💰️ Order pair [{merchant}] / [{marketplace}] marked as paid");
        Ok(result)
    }

    /// Cancels both sides atomically and notifies the order-annulled hook subscribers.
    pub async fn cancel_order_pair(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
        cancelled_at: DateTime<Utc>,
    ) -> Result<(Order, Order), OrderFlowError> {
        let (merchant, marketplace) = self.db.cancel_order_pair(merchant, marketplace, cancelled_at).await?;
        debug!("🔄️❌️ Order pair [{}] / [{}] cancelled", merchant.order_id, marketplace.order_id);
        for emitter in &self.producers.order_annulled_producer {
            let event = OrderAnnulledEvent::new(merchant.clone());
            emitter.publish_event(event).await;
        }
        Ok((merchant, marketplace))
    }

    pub async fn fulfill_order_pair(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
        update: FulfillmentUpdate,
    ) -> Result<(Order, Order), OrderFlowError> {
        let result = self.db.fulfill_order_pair(merchant, marketplace, update).await?;
        debug!("🔄️🚚️ Order pair [{merchant}] / [{marketplace}] fulfilled");
        Ok(result)
    }

    pub async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, OrderFlowError> {
        self.db.insert_notification(notification).await
    }

    async fn call_order_mirrored_hook(&self, merchant: &Order, marketplace: &Order) {
        for emitter in &self.producers.order_mirrored_producer {
            debug!("🔄️📦️ Notifying order mirrored hook subscribers");
            let event = OrderMirroredEvent::new(merchant.clone(), marketplace.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

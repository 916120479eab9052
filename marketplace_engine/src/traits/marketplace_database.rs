use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
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
};

/// This trait defines the storage behaviour behind the order mirroring flows.
///
/// This behaviour includes:
/// * Resolving stores, in particular the single marketplace storefront.
/// * Idempotency checks and lookups on mirrored orders.
/// * Atomic dual-order writes and paired status transitions.
/// * Buyer upserts and merchant notifications.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Returns the single active, internally-flagged storefront that aggregates orders.
    ///
    /// Zero candidates or more than one candidate are distinct, loud failures: the first means the gateway is not
    /// installed, the second means the data violates the one-marketplace invariant.
    async fn fetch_marketplace_store(&self) -> Result<Store, OrderFlowError>;

    /// Fetches a store by its myshopify domain, regardless of flags.
    async fn fetch_store_by_url(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError>;

    /// Fetches a store by its myshopify domain, but only if it is active.
    async fn fetch_active_store(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError>;

    async fn fetch_store_by_id(&self, store_id: i64) -> Result<Option<Store>, OrderFlowError>;

    /// Checks whether an order with the given remote id already exists. Returns the internal id if it does.
    async fn order_exists(&self, order_id: &OrderId) -> Result<Option<i64>, OrderFlowError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;

    /// Inserts the buyer, or updates their contact details if the email is already known.
    async fn upsert_user(&self, user: NewUser) -> Result<User, OrderFlowError>;

    /// Resolves a marketplace-facing product gid to its bundle record.
    async fn fetch_bundle_by_product_id(&self, product_gid: &str) -> Result<Option<Bundle>, OrderFlowError>;

    /// Resolves a marketplace variant gid to the merchant-side variant gid through the bundle's variant mapping.
    async fn fetch_variant_mapping(
        &self,
        bundle_id: i64,
        marketplace_variant_id: &str,
    ) -> Result<Option<String>, OrderFlowError>;

    /// The merchant's packaging box inventory, joined with the box catalog.
    async fn fetch_box_inventory(&self, store_id: i64) -> Result<Vec<StoreBoxInventory>, OrderFlowError>;

    /// Commits a mirrored order in a single transaction: the marketplace row, every merchant row
    /// (cross-referenced), the bundle lines for each, and the bundle/box inventory decrements. If any remote id
    /// already exists, nothing at all is written and [`OrderFlowError::OrderAlreadyExists`] is returned.
    async fn insert_mirrored_order(&self, order: NewMirroredOrder) -> Result<MirroredOrders, OrderFlowError>;

    /// Marks both sides of an order pair as paid in a single transaction.
    async fn mark_order_pair_paid(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
    ) -> Result<(Order, Order), OrderFlowError>;

    /// Cancels both sides of an order pair in a single transaction: status `Cancelled`, payment `Refunded`, and the
    /// cancellation timestamp recorded.
    async fn cancel_order_pair(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
        cancelled_at: DateTime<Utc>,
    ) -> Result<(Order, Order), OrderFlowError>;

    /// Marks both sides of an order pair as fulfilled and records the tracking details, in a single transaction.
    async fn fulfill_order_pair(
        &self,
        merchant: &OrderId,
        marketplace: &OrderId,
        update: FulfillmentUpdate,
    ) -> Result<(Order, Order), OrderFlowError>;

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists: {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has no counterpart order reference")]
    MissingCounterpart(OrderId),
    #[error("No active marketplace store is configured")]
    NoMarketplaceStore,
    #[error("{0} stores claim to be the marketplace. Exactly one must be active and internal")]
    AmbiguousMarketplaceStore(usize),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

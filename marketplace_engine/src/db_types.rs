use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dmg_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------

/// The remote platform's order identifier (`gid://shopify/Order/...`). Both sides of a mirrored order pair are
/// keyed by their remote gid; the numeric database id is internal.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       OrderSide        ------------------------------------------------------

/// Which storefront an order record belongs to. Every webhook order produces one row per side, cross-referenced
/// through `counterpart_order_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderSide {
    Marketplace,
    Merchant,
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Marketplace => write!(f, "Marketplace"),
            OrderSide::Merchant => write!(f, "Merchant"),
        }
    }
}

//--------------------------------------    OrderStatusType     ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed on both storefronts and is awaiting fulfillment.
    Pending,
    /// The merchant has shipped and the fulfillment has been mirrored to the marketplace.
    Fulfilled,
    /// The order was cancelled on the marketplace and annulled on both sides.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Fulfilled => write!(f, "Fulfilled"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Fulfilled" => Ok(Self::Fulfilled),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------   PaymentStatusType    ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// Payment has not been captured yet.
    Pending,
    /// The marketplace payment has been captured and mirrored.
    Paid,
    /// The order was cancelled and the payment refunded.
    Refunded,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Paid => write!(f, "Paid"),
            PaymentStatusType::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatusType::Pending
        })
    }
}

impl PaymentStatusType {
    /// Maps the webhook's `financial_status` field ("pending", "paid", "refunded", "partially_paid", ...).
    pub fn from_financial_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "paid" => Self::Paid,
            "refunded" | "partially_refunded" => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

//--------------------------------------        Store        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct Store {
    pub id: i64,
    pub store_url: String,
    pub shop_name: String,
    pub access_token: String,
    pub is_active: bool,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        User         ---------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
}

//--------------------------------------        Order        ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub side: OrderSide,
    pub counterpart_order_id: Option<OrderId>,
    pub store_id: i64,
    pub user_id: Option<i64>,
    pub amount: Money,
    pub currency: String,
    pub discount: Money,
    pub vendor: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub payment_gateways: String,
    pub order_status_url: Option<String>,
    pub tracking_url: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub counterpart_order_id: Option<OrderId>,
    pub store_id: i64,
    pub user_id: Option<i64>,
    pub amount: Money,
    pub currency: String,
    pub discount: Money,
    pub vendor: String,
    pub payment_status: PaymentStatusType,
    pub payment_gateways: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn gateways_column(&self) -> String {
        self.payment_gateways.join(",")
    }
}

/// One bundle line of a mirrored order. `store_box_id` is set when the shopper asked for packaging and the
/// merchant has box inventory to consume.
#[derive(Debug, Clone)]
pub struct BundleLine {
    pub bundle_id: i64,
    pub quantity: i64,
    pub store_box_id: Option<i64>,
}

/// One merchant's share of a mirrored order: the order row to create plus the bundle lines behind it.
#[derive(Debug, Clone)]
pub struct NewMerchantOrder {
    pub order: NewOrder,
    pub bundles: Vec<BundleLine>,
}

/// Everything that must be committed in a single transaction when a marketplace order is mirrored: the
/// marketplace-side row, one merchant-side row per owning store, all bundle lines, and the inventory consumed.
/// A cart usually resolves to a single merchant, but nothing requires it to.
#[derive(Debug, Clone)]
pub struct NewMirroredOrder {
    pub marketplace_order: NewOrder,
    pub merchant_orders: Vec<NewMerchantOrder>,
}

impl NewMirroredOrder {
    /// The union of all merchants' bundle lines; recorded against the marketplace-side row.
    pub fn all_bundles(&self) -> Vec<BundleLine> {
        self.merchant_orders.iter().flat_map(|m| m.bundles.iter().cloned()).collect()
    }
}

/// The committed records of a mirrored order.
#[derive(Debug, Clone)]
pub struct MirroredOrders {
    pub marketplace_order: Order,
    pub merchant_orders: Vec<Order>,
}

/// Fields written when an order pair is marked fulfilled.
#[derive(Debug, Clone, Default)]
pub struct FulfillmentUpdate {
    pub order_status_url: Option<String>,
    pub tracking_url: Option<String>,
}

//--------------------------------------        Bundle       ---------------------------------------------------------

/// A marketplace-facing product that maps to inventory owned by a merchant store.
#[derive(Debug, Clone, FromRow)]
pub struct Bundle {
    pub id: i64,
    pub shopify_product_id: String,
    pub vendor_product_id: Option<String>,
    pub store_id: i64,
    pub price: Money,
    pub inventory: i64,
    pub box_id: Option<i64>,
    pub status: String,
    pub is_deleted: bool,
    pub is_temp: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     StoreBoxInventory   -----------------------------------------------------

/// A merchant's stock of one packaging box, joined with the box catalog entry.
#[derive(Debug, Clone, FromRow)]
pub struct StoreBoxInventory {
    pub id: i64,
    pub store_id: i64,
    pub box_id: i64,
    pub box_name: String,
    pub box_price: Money,
    pub remaining: i64,
    pub used: i64,
    pub shopify_variant_id: Option<String>,
}

impl StoreBoxInventory {
    /// A box can only be added to a merchant order when stock remains and the box is purchasable on Shopify.
    pub fn is_orderable(&self) -> bool {
        self.remaining > 0 && self.shopify_variant_id.is_some()
    }
}

//--------------------------------------       Product       ---------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: i64,
    pub product_id: String,
    pub store_id: i64,
    pub title: String,
    pub handle: String,
    pub description: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: String,
    pub online_store_url: Option<String>,
    pub total_inventory: i64,
    pub total_variants: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub product_id: String,
    pub store_id: i64,
    pub title: String,
    pub handle: String,
    pub description: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: Vec<String>,
    pub online_store_url: Option<String>,
    pub variants: Vec<NewProductVariant>,
}

impl NewProduct {
    pub fn total_inventory(&self) -> i64 {
        self.variants.iter().map(|v| v.inventory_quantity).sum()
    }

    pub fn tags_column(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewProductVariant {
    pub variant_id: String,
    pub title: String,
    pub price: Money,
    pub inventory_quantity: i64,
}

//--------------------------------------       Coupon        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct Coupon {
    pub id: i64,
    pub shopify_id: String,
    pub store_id: i64,
    pub code: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     Notification     --------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: i64,
    pub store_id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub store_id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
}

impl NewNotification {
    /// The notice a merchant sees when a marketplace order lands on their store.
    pub fn new_order(store_id: i64) -> Self {
        Self {
            store_id,
            category: "orders".to_string(),
            title: "You have a new order".to_string(),
            description: "A new marketplace order is waiting for you to fulfill!".to_string(),
        }
    }
}

//--------------------------------------     CatalogPurge     --------------------------------------------------------

/// Row counts removed during store teardown.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogPurge {
    pub products: u64,
    pub variants: u64,
    pub store_boxes: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [OrderStatusType::Pending, OrderStatusType::Fulfilled, OrderStatusType::Cancelled] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        for status in [PaymentStatusType::Pending, PaymentStatusType::Paid, PaymentStatusType::Refunded] {
            assert_eq!(status.to_string().parse::<PaymentStatusType>().unwrap(), status);
        }
    }

    #[test]
    fn financial_status_mapping() {
        assert_eq!(PaymentStatusType::from_financial_status("paid"), PaymentStatusType::Paid);
        assert_eq!(PaymentStatusType::from_financial_status("pending"), PaymentStatusType::Pending);
        assert_eq!(PaymentStatusType::from_financial_status("refunded"), PaymentStatusType::Refunded);
        assert_eq!(PaymentStatusType::from_financial_status("authorized"), PaymentStatusType::Pending);
    }

    #[test]
    fn box_orderability() {
        let mut inv = StoreBoxInventory {
            id: 1,
            store_id: 1,
            box_id: 1,
            box_name: "Small".into(),
            box_price: dmg_common::Money::from_cents(299),
            remaining: 4,
            used: 0,
            shopify_variant_id: Some("gid://shopify/ProductVariant/1".into()),
        };
        assert!(inv.is_orderable());
        inv.remaining = 0;
        assert!(!inv.is_orderable());
        inv.remaining = 2;
        inv.shopify_variant_id = None;
        assert!(!inv.is_orderable());
    }
}

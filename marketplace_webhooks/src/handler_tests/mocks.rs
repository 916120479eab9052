use std::time::Duration;

use chrono::{DateTime, Utc};
use dmg_common::Money;
use marketplace_engine::{
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
        OrderSide,
        OrderStatusType,
        PaymentStatusType,
        Product,
        Store,
        StoreBoxInventory,
        User,
    },
    events::EventProducers,
    traits::{CatalogError, CatalogManagement, MarketplaceDatabase, OrderFlowError},
    CatalogApi,
    OrderSyncApi,
};
use mockall::mock;
use serde_json::json;
use shopify_admin::{
    data_objects::{
        DraftOrderInput,
        FulfillmentInput,
        Nodes,
        OrderWebhook,
        ProductDetails,
        ProductRef,
        ProductVariantNode,
        VariantDetails,
    },
    CancelOptions,
    ShopifyApiError,
};

use crate::{
    handlers::HandlerContext,
    remote::{RemoteCommerce, StoreAuth},
    retry::RetryConfig,
};

mock! {
    pub Db {}
    impl Clone for Db {
        fn clone(&self) -> Self;
    }
    impl MarketplaceDatabase for Db {
        fn url(&self) -> &str;
        async fn fetch_marketplace_store(&self) -> Result<Store, OrderFlowError>;
        async fn fetch_store_by_url(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError>;
        async fn fetch_active_store(&self, store_url: &str) -> Result<Option<Store>, OrderFlowError>;
        async fn fetch_store_by_id(&self, store_id: i64) -> Result<Option<Store>, OrderFlowError>;
        async fn order_exists(&self, order_id: &OrderId) -> Result<Option<i64>, OrderFlowError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;
        async fn upsert_user(&self, user: NewUser) -> Result<User, OrderFlowError>;
        async fn fetch_bundle_by_product_id(&self, product_gid: &str) -> Result<Option<Bundle>, OrderFlowError>;
        async fn fetch_variant_mapping(&self, bundle_id: i64, marketplace_variant_id: &str) -> Result<Option<String>, OrderFlowError>;
        async fn fetch_box_inventory(&self, store_id: i64) -> Result<Vec<StoreBoxInventory>, OrderFlowError>;
        async fn insert_mirrored_order(&self, order: NewMirroredOrder) -> Result<MirroredOrders, OrderFlowError>;
        async fn mark_order_pair_paid(&self, merchant: &OrderId, marketplace: &OrderId) -> Result<(Order, Order), OrderFlowError>;
        async fn cancel_order_pair(&self, merchant: &OrderId, marketplace: &OrderId, cancelled_at: DateTime<Utc>) -> Result<(Order, Order), OrderFlowError>;
        async fn fulfill_order_pair(&self, merchant: &OrderId, marketplace: &OrderId, update: FulfillmentUpdate) -> Result<(Order, Order), OrderFlowError>;
        async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, OrderFlowError>;
    }
    impl CatalogManagement for Db {
        async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn fetch_product(&self, store_id: i64, product_gid: &str) -> Result<Option<Product>, CatalogError>;
        async fn fetch_live_bundles(&self, store_id: i64) -> Result<Vec<Bundle>, CatalogError>;
        async fn fetch_coupons(&self, store_id: i64) -> Result<Vec<Coupon>, CatalogError>;
        async fn mark_coupon_deleted(&self, coupon_id: i64) -> Result<(), CatalogError>;
        async fn purge_store_catalog(&self, store_id: i64) -> Result<CatalogPurge, CatalogError>;
        async fn deactivate_store(&self, store_id: i64) -> Result<Store, CatalogError>;
    }
}

mock! {
    pub Remote {}
    impl Clone for Remote {
        fn clone(&self) -> Self;
    }
    impl RemoteCommerce for Remote {
        async fn fetch_variant_product(&self, auth: &StoreAuth, variant_gid: &str) -> Result<ProductVariantNode, ShopifyApiError>;
        async fn fetch_product(&self, auth: &StoreAuth, product_gid: &str) -> Result<Option<ProductDetails>, ShopifyApiError>;
        async fn place_draft_order(&self, auth: &StoreAuth, input: &DraftOrderInput, payment_pending: bool) -> Result<String, ShopifyApiError>;
        async fn mark_order_as_paid(&self, auth: &StoreAuth, order_gid: &str) -> Result<(), ShopifyApiError>;
        async fn cancel_order(&self, auth: &StoreAuth, order_gid: &str, options: &CancelOptions) -> Result<(), ShopifyApiError>;
        async fn fulfillment_order_id(&self, auth: &StoreAuth, order_gid: &str) -> Result<Option<String>, ShopifyApiError>;
        async fn create_fulfillment(&self, auth: &StoreAuth, input: &FulfillmentInput) -> Result<(), ShopifyApiError>;
        async fn delete_product(&self, auth: &StoreAuth, product_gid: &str) -> Result<(), ShopifyApiError>;
        async fn delete_discount(&self, auth: &StoreAuth, discount_gid: &str) -> Result<(), ShopifyApiError>;
    }
}

/// Retry policy for tests: effectively instant, two retries.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        multiplier: 2.0,
        jitter_factor: 0.0,
        max_attempts: 2,
    }
}

pub fn ctx(orders_db: MockDb, catalog_db: MockDb, remote: MockRemote) -> HandlerContext<MockDb, MockRemote> {
    HandlerContext {
        orders: OrderSyncApi::new(orders_db, EventProducers::default()),
        catalog: CatalogApi::new(catalog_db),
        remote,
        retry: fast_retry(),
    }
}

pub const MARKETPLACE_URL: &str = "marketplace.myshopify.com";
pub const MERCHANT_URL: &str = "merchant.myshopify.com";

pub fn store(id: i64, url: &str, internal: bool) -> Store {
    Store {
        id,
        store_url: url.to_string(),
        shop_name: url.split('.').next().unwrap_or(url).to_string(),
        access_token: "shpat_test_token".to_string(),
        is_active: true,
        is_internal: internal,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn order(gid: &str, side: OrderSide, store_id: i64, counterpart: Option<&str>) -> Order {
    Order {
        id: 1,
        order_id: OrderId(gid.to_string()),
        side,
        counterpart_order_id: counterpart.map(|c| OrderId(c.to_string())),
        store_id,
        user_id: None,
        amount: Money::from_cents(2500),
        currency: "USD".to_string(),
        discount: Money::default(),
        vendor: MERCHANT_URL.to_string(),
        status: OrderStatusType::Pending,
        payment_status: PaymentStatusType::Pending,
        payment_gateways: String::new(),
        order_status_url: None,
        tracking_url: None,
        cancelled_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn bundle(id: i64, store_id: i64, product_gid: &str, price_cents: i64) -> Bundle {
    Bundle {
        id,
        shopify_product_id: product_gid.to_string(),
        vendor_product_id: Some(format!("{product_gid}-vendor")),
        store_id,
        price: Money::from_cents(price_cents),
        inventory: 10,
        box_id: None,
        status: "active".to_string(),
        is_deleted: false,
        is_temp: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn variant_node(variant_gid: &str, product_gid: &str, price: &str) -> ProductVariantNode {
    ProductVariantNode {
        id: variant_gid.to_string(),
        title: "Default".to_string(),
        price: price.to_string(),
        product: ProductRef { id: product_gid.to_string(), title: "Bundle".to_string() },
    }
}

pub fn product_details(product_gid: &str) -> ProductDetails {
    ProductDetails {
        id: product_gid.to_string(),
        title: "Hand-poured candle".to_string(),
        handle: "hand-poured-candle".to_string(),
        description: "A candle".to_string(),
        description_html: "<p>A candle</p>".to_string(),
        vendor: "Wax & Wick".to_string(),
        product_type: "Candles".to_string(),
        tags: vec!["gift".to_string()],
        online_store_url: None,
        created_at: "2024-06-01T12:00:00Z".to_string(),
        updated_at: "2024-06-01T12:00:00Z".to_string(),
        variants: Nodes {
            nodes: vec![
                VariantDetails {
                    id: "gid://shopify/ProductVariant/1".to_string(),
                    title: "Vanilla".to_string(),
                    price: "18.99".to_string(),
                    inventory_quantity: 12,
                },
                VariantDetails {
                    id: "gid://shopify/ProductVariant/2".to_string(),
                    title: "Cedar".to_string(),
                    price: "18.99".to_string(),
                    inventory_quantity: 3,
                },
            ],
        },
    }
}

pub fn product_record(store_id: i64, product_gid: &str) -> Product {
    Product {
        id: 1,
        product_id: product_gid.to_string(),
        store_id,
        title: "Hand-poured candle".to_string(),
        handle: "hand-poured-candle".to_string(),
        description: "A candle".to_string(),
        body_html: "<p>A candle</p>".to_string(),
        vendor: "Wax & Wick".to_string(),
        product_type: "Candles".to_string(),
        tags: "[\"gift\"]".to_string(),
        online_store_url: None,
        total_inventory: 15,
        total_variants: 2,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn order_payload(gid: &str, financial_status: &str) -> OrderWebhook {
    serde_json::from_value(json!({
        "id": 6543210,
        "admin_graphql_api_id": gid,
        "created_at": "2024-06-01T12:00:00Z",
        "currency": "USD",
        "financial_status": financial_status,
        "payment_gateway_names": ["shopify_payments"],
        "line_items": [
            { "product_id": 11, "variant_id": 1, "quantity": 2 }
        ]
    }))
    .expect("valid order payload")
}

pub fn transient_error() -> ShopifyApiError {
    ShopifyApiError::QueryError { status: 503, message: "service unavailable".to_string() }
}

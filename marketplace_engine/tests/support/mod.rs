//! Shared fixtures for the engine integration tests: an in-memory, fully migrated database and seeding helpers for
//! the records the order flows expect to find (stores are created by the install flow, which lives outside this
//! crate).
use chrono::Utc;
use dmg_common::Money;
use marketplace_engine::{
    db_types::{NewOrder, OrderId, OrderSide, PaymentStatusType},
    SqliteDatabase,
};

pub async fn prepare_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_in_memory().await.expect("Error creating in-memory database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

pub async fn seed_store(db: &SqliteDatabase, url: &str, active: bool, internal: bool) -> i64 {
    sqlx::query("INSERT INTO stores (store_url, shop_name, access_token, is_active, is_internal) VALUES ($1, $2, $3, $4, $5)")
        .bind(url)
        .bind(url.split('.').next().unwrap_or(url))
        .bind("shpat_test_token")
        .bind(active)
        .bind(internal)
        .execute(db.pool())
        .await
        .expect("Error seeding store")
        .last_insert_rowid()
}

pub async fn seed_box(db: &SqliteDatabase, name: &str, price: Money) -> i64 {
    sqlx::query("INSERT INTO boxes (name, price) VALUES ($1, $2)")
        .bind(name)
        .bind(price.value())
        .execute(db.pool())
        .await
        .expect("Error seeding box")
        .last_insert_rowid()
}

pub async fn seed_store_box(
    db: &SqliteDatabase,
    store_id: i64,
    box_id: i64,
    remaining: i64,
    shopify_variant_id: Option<&str>,
) -> i64 {
    sqlx::query("INSERT INTO store_boxes (store_id, box_id, remaining, used, shopify_variant_id) VALUES ($1, $2, $3, 0, $4)")
        .bind(store_id)
        .bind(box_id)
        .bind(remaining)
        .bind(shopify_variant_id)
        .execute(db.pool())
        .await
        .expect("Error seeding store box")
        .last_insert_rowid()
}

pub async fn seed_bundle(
    db: &SqliteDatabase,
    store_id: i64,
    product_gid: &str,
    price: Money,
    inventory: i64,
    box_id: Option<i64>,
) -> i64 {
    sqlx::query(
        "INSERT INTO bundles (shopify_product_id, vendor_product_id, store_id, price, inventory, box_id) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(product_gid)
    .bind(format!("{product_gid}-vendor"))
    .bind(store_id)
    .bind(price.value())
    .bind(inventory)
    .bind(box_id)
    .execute(db.pool())
    .await
    .expect("Error seeding bundle")
    .last_insert_rowid()
}

pub async fn seed_variant_mapping(db: &SqliteDatabase, bundle_id: i64, marketplace_variant: &str, merchant_variant: &str) {
    sqlx::query("INSERT INTO bundle_variants (bundle_id, marketplace_variant_id, merchant_variant_id) VALUES ($1, $2, $3)")
        .bind(bundle_id)
        .bind(marketplace_variant)
        .bind(merchant_variant)
        .execute(db.pool())
        .await
        .expect("Error seeding variant mapping");
}

pub async fn seed_coupon(db: &SqliteDatabase, store_id: i64, shopify_id: &str, code: &str) -> i64 {
    sqlx::query("INSERT INTO coupons (shopify_id, store_id, code) VALUES ($1, $2, $3)")
        .bind(shopify_id)
        .bind(store_id)
        .bind(code)
        .execute(db.pool())
        .await
        .expect("Error seeding coupon")
        .last_insert_rowid()
}

pub fn new_order(order_id: &str, side: OrderSide, store_id: i64, amount: Money, counterpart: Option<&str>) -> NewOrder {
    NewOrder {
        order_id: OrderId(order_id.to_string()),
        side,
        counterpart_order_id: counterpart.map(|c| OrderId(c.to_string())),
        store_id,
        user_id: None,
        amount,
        currency: "USD".to_string(),
        discount: Money::default(),
        vendor: "merchant.myshopify.com".to_string(),
        payment_status: PaymentStatusType::Pending,
        payment_gateways: vec!["shopify_payments".to_string()],
        created_at: Utc::now(),
    }
}

pub async fn count_rows(db: &SqliteDatabase, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("Error counting rows");
    count
}

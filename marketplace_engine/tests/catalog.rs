mod support;

use dmg_common::Money;
use marketplace_engine::{
    db_types::{NewProduct, NewProductVariant},
    events::EventProducers,
    traits::CatalogError,
    CatalogApi,
    OrderSyncApi,
};
use support::{count_rows, prepare_db, seed_box, seed_bundle, seed_coupon, seed_store, seed_store_box, seed_variant_mapping};

fn sample_product(store_id: i64, gid: &str) -> NewProduct {
    NewProduct {
        product_id: gid.to_string(),
        store_id,
        title: "Hand-poured candle".to_string(),
        handle: "hand-poured-candle".to_string(),
        description: "A candle".to_string(),
        body_html: "<p>A candle</p>".to_string(),
        vendor: "Wax & Wick".to_string(),
        product_type: "Candles".to_string(),
        tags: vec!["gift".to_string(), "home".to_string()],
        online_store_url: Some("https://merchant.myshopify.com/products/hand-poured-candle".to_string()),
        variants: vec![
            NewProductVariant {
                variant_id: "gid://shopify/ProductVariant/1".to_string(),
                title: "Vanilla".to_string(),
                price: Money::from_cents(1899),
                inventory_quantity: 12,
            },
            NewProductVariant {
                variant_id: "gid://shopify/ProductVariant/2".to_string(),
                title: "Cedar".to_string(),
                price: Money::from_cents(1899),
                inventory_quantity: 3,
            },
        ],
    }
}

#[tokio::test]
async fn product_mirror_insert_and_redelivery() {
    let db = prepare_db().await;
    let api = CatalogApi::new(db.clone());
    let store_id = seed_store(&db, "merchant.myshopify.com", true, false).await;

    let product = api.insert_product(sample_product(store_id, "gid://shopify/Product/11")).await.unwrap();
    assert_eq!(product.total_inventory, 15);
    assert_eq!(product.total_variants, 2);
    assert_eq!(count_rows(&db, "product_variants").await, 2);

    // products/create webhooks are redelivered; the second insert must be refused, not duplicated
    let err = api.insert_product(sample_product(store_id, "gid://shopify/Product/11")).await;
    assert!(matches!(err, Err(CatalogError::ProductAlreadyExists(_))));
    assert_eq!(count_rows(&db, "products").await, 1);
}

#[tokio::test]
async fn product_upsert_replaces_variants() {
    let db = prepare_db().await;
    let api = CatalogApi::new(db.clone());
    let store_id = seed_store(&db, "merchant.myshopify.com", true, false).await;

    api.insert_product(sample_product(store_id, "gid://shopify/Product/11")).await.unwrap();

    let mut update = sample_product(store_id, "gid://shopify/Product/11");
    update.title = "Hand-poured candle (new)".to_string();
    update.variants.truncate(1);
    update.variants[0].inventory_quantity = 7;
    let product = api.upsert_product(update).await.unwrap();

    assert_eq!(product.title, "Hand-poured candle (new)");
    assert_eq!(product.total_inventory, 7);
    assert_eq!(product.total_variants, 1);
    assert_eq!(count_rows(&db, "products").await, 1);
    assert_eq!(count_rows(&db, "product_variants").await, 1);

    let fetched = api.fetch_product(store_id, "gid://shopify/Product/11").await.unwrap();
    assert!(fetched.is_some());
}

#[tokio::test]
async fn variant_mapping_resolution() {
    let db = prepare_db().await;
    let orders = OrderSyncApi::new(db.clone(), EventProducers::default());
    let store_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let bundle_id = seed_bundle(&db, store_id, "gid://shopify/Product/11", Money::from_cents(2500), 10, None).await;
    seed_variant_mapping(&db, bundle_id, "gid://shopify/ProductVariant/1", "gid://shopify/ProductVariant/901").await;

    let bundle = orders.bundle_by_product_id("gid://shopify/Product/11").await.unwrap().expect("bundle should resolve");
    assert_eq!(bundle.id, bundle_id);

    let mapped = orders.variant_mapping(bundle_id, "gid://shopify/ProductVariant/1").await.unwrap();
    assert_eq!(mapped.as_deref(), Some("gid://shopify/ProductVariant/901"));

    // An unmapped marketplace variant resolves to nothing; callers treat this as an invariant violation
    let unmapped = orders.variant_mapping(bundle_id, "gid://shopify/ProductVariant/2").await.unwrap();
    assert!(unmapped.is_none());
}

#[tokio::test]
async fn store_teardown_purges_catalog_and_deactivates() {
    let db = prepare_db().await;
    let api = CatalogApi::new(db.clone());
    let orders = OrderSyncApi::new(db.clone(), EventProducers::default());
    let store_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let other_store = seed_store(&db, "bystander.myshopify.com", true, false).await;

    api.insert_product(sample_product(store_id, "gid://shopify/Product/11")).await.unwrap();
    api.insert_product(sample_product(other_store, "gid://shopify/Product/21")).await.unwrap();
    let box_id = seed_box(&db, "Small gift box", Money::from_cents(299)).await;
    seed_store_box(&db, store_id, box_id, 5, None).await;
    seed_bundle(&db, store_id, "gid://shopify/Product/31", Money::from_cents(999), 2, None).await;
    let coupon_id = seed_coupon(&db, store_id, "gid://shopify/DiscountCodeNode/5", "WELCOME10").await;

    let bundles = api.live_bundles(store_id).await.unwrap();
    assert_eq!(bundles.len(), 1);
    let coupons = api.coupons(store_id).await.unwrap();
    assert_eq!(coupons.len(), 1);

    api.mark_coupon_deleted(coupon_id).await.unwrap();
    assert!(api.coupons(store_id).await.unwrap().is_empty());

    let purge = api.purge_store_catalog(store_id).await.unwrap();
    assert_eq!(purge.products, 1);
    assert_eq!(purge.variants, 2);
    assert_eq!(purge.store_boxes, 1);

    // The bystander store's mirror is untouched
    assert_eq!(count_rows(&db, "products").await, 1);

    let store = api.deactivate_store(store_id).await.unwrap();
    assert!(!store.is_active);
    assert!(orders.active_store("merchant.myshopify.com").await.unwrap().is_none());
    assert!(orders.store_by_url("merchant.myshopify.com").await.unwrap().is_some());
}

#[tokio::test]
async fn deactivating_a_missing_store_fails() {
    let db = prepare_db().await;
    let api = CatalogApi::new(db);
    assert!(matches!(api.deactivate_store(99).await, Err(CatalogError::StoreNotFound(99))));
}

use marketplace_engine::traits::CatalogError;
use serde_json::json;
use shopify_admin::data_objects::ProductWebhook;

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handler_tests::mocks::{ctx, product_details, product_record, store, MockDb, MockRemote, MERCHANT_URL},
    handlers::{product_created, product_updated},
};

fn product_payload(gid: &str) -> ProductWebhook {
    serde_json::from_value(json!({
        "id": 11,
        "admin_graphql_api_id": gid,
        "title": "Hand-poured candle"
    }))
    .expect("valid product payload")
}

#[tokio::test]
async fn product_create_mirrors_the_remote_record() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));

    let mut catalog_db = MockDb::new();
    catalog_db
        .expect_insert_product()
        .withf(|p| {
            p.store_id == 2
                && p.product_id == "gid://shopify/Product/11"
                && p.variants.len() == 2
                && p.total_inventory() == 15
        })
        .times(1)
        .returning(|p| Ok(product_record(p.store_id, &p.product_id)));

    let mut remote = MockRemote::new();
    remote
        .expect_fetch_product()
        .withf(|auth, gid| auth.store_url == MERCHANT_URL && gid == "gid://shopify/Product/11")
        .returning(|_, gid| Ok(Some(product_details(gid))));

    let ctx = ctx(orders_db, catalog_db, remote);
    let outcome = product_created(&ctx, MERCHANT_URL, product_payload("gid://shopify/Product/11")).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
}

#[tokio::test]
async fn product_create_redelivery_is_benign() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));

    let mut catalog_db = MockDb::new();
    catalog_db
        .expect_insert_product()
        .returning(|p| Err(CatalogError::ProductAlreadyExists(p.product_id)));

    let mut remote = MockRemote::new();
    remote.expect_fetch_product().returning(|_, gid| Ok(Some(product_details(gid))));

    let ctx = ctx(orders_db, catalog_db, remote);
    let outcome = product_created(&ctx, MERCHANT_URL, product_payload("gid://shopify/Product/11")).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::AlreadyProcessed);
}

#[tokio::test]
async fn product_update_refreshes_the_mirror() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));

    let mut catalog_db = MockDb::new();
    catalog_db
        .expect_upsert_product()
        .withf(|p| p.product_id == "gid://shopify/Product/11")
        .times(1)
        .returning(|p| Ok(product_record(p.store_id, &p.product_id)));

    let mut remote = MockRemote::new();
    remote.expect_fetch_product().returning(|_, gid| Ok(Some(product_details(gid))));

    let ctx = ctx(orders_db, catalog_db, remote);
    let outcome = product_updated(&ctx, MERCHANT_URL, product_payload("gid://shopify/Product/11")).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
}

#[tokio::test]
async fn product_gone_from_the_remote_store_is_not_found() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));

    let catalog_db = MockDb::new();
    let mut remote = MockRemote::new();
    remote.expect_fetch_product().returning(|_, _| Ok(None));

    let ctx = ctx(orders_db, catalog_db, remote);
    let err = product_created(&ctx, MERCHANT_URL, product_payload("gid://shopify/Product/11")).await.unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[tokio::test]
async fn inactive_store_fails_the_precondition() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_active_store().returning(|_| Ok(None));

    let ctx = ctx(orders_db, MockDb::new(), MockRemote::new());
    let err = product_created(&ctx, MERCHANT_URL, product_payload("gid://shopify/Product/11")).await.unwrap_err();
    assert!(matches!(err, HandlerError::PreconditionFailed(_)));
}

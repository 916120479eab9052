use chrono::Utc;
use marketplace_engine::db_types::{CatalogPurge, Coupon};
use serde_json::json;
use shopify_admin::{data_objects::AppUninstalledWebhook, ShopifyApiError};

use crate::{
    errors::HandlerOutcome,
    handler_tests::mocks::{bundle, ctx, store, MockDb, MockRemote, MARKETPLACE_URL, MERCHANT_URL},
    handlers::app_uninstalled,
};

fn uninstall_payload(domain: &str) -> AppUninstalledWebhook {
    serde_json::from_value(json!({ "myshopify_domain": domain })).expect("valid uninstall payload")
}

#[tokio::test]
async fn teardown_continues_past_remote_failures() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_store_by_url().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));
    orders_db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));

    let mut catalog_db = MockDb::new();
    catalog_db.expect_fetch_live_bundles().returning(|_| Ok(vec![bundle(5, 2, "gid://shopify/Product/11", 2500)]));
    catalog_db.expect_fetch_coupons().returning(|_| {
        Ok(vec![Coupon {
            id: 9,
            shopify_id: "gid://shopify/DiscountCodeNode/5".to_string(),
            store_id: 2,
            code: Some("WELCOME10".to_string()),
            is_deleted: false,
            created_at: Utc::now(),
        }])
    });
    catalog_db.expect_mark_coupon_deleted().withf(|id| *id == 9).times(1).returning(|_| Ok(()));
    catalog_db
        .expect_purge_store_catalog()
        .times(1)
        .returning(|_| Ok(CatalogPurge { products: 1, variants: 2, store_boxes: 1 }));
    catalog_db.expect_deactivate_store().withf(|id| *id == 2).times(1).returning(|id| {
        let mut s = store(id, MERCHANT_URL, false);
        s.is_active = false;
        Ok(s)
    });

    let mut remote = MockRemote::new();
    // The marketplace-side delete fails permanently; the merchant-side delete succeeds. Teardown must proceed.
    remote.expect_delete_product().times(2).returning(|auth, _| {
        if auth.store_url == MARKETPLACE_URL {
            Err(ShopifyApiError::UserErrors("product was already removed".to_string()))
        } else {
            Ok(())
        }
    });
    remote.expect_delete_discount().times(1).returning(|_, _| Ok(()));

    let ctx = ctx(orders_db, catalog_db, remote);
    let outcome = app_uninstalled(&ctx, uninstall_payload(MERCHANT_URL)).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
}

#[tokio::test]
async fn coupons_stay_live_when_the_remote_delete_fails() {
    let mut orders_db = MockDb::new();
    orders_db.expect_fetch_store_by_url().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));
    orders_db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));

    let mut catalog_db = MockDb::new();
    catalog_db.expect_fetch_live_bundles().returning(|_| Ok(vec![]));
    catalog_db.expect_fetch_coupons().returning(|_| {
        Ok(vec![Coupon {
            id: 9,
            shopify_id: "gid://shopify/DiscountCodeNode/5".to_string(),
            store_id: 2,
            code: None,
            is_deleted: false,
            created_at: Utc::now(),
        }])
    });
    // The local record must not be flagged deleted if the remote coupon is still live
    catalog_db.expect_mark_coupon_deleted().never();
    catalog_db.expect_purge_store_catalog().returning(|_| Ok(CatalogPurge::default()));
    catalog_db.expect_deactivate_store().returning(|id| {
        let mut s = store(id, MERCHANT_URL, false);
        s.is_active = false;
        Ok(s)
    });

    let mut remote = MockRemote::new();
    remote
        .expect_delete_discount()
        .times(1)
        .returning(|_, _| Err(ShopifyApiError::UserErrors("discount does not exist".to_string())));

    let ctx = ctx(orders_db, catalog_db, remote);
    let outcome = app_uninstalled(&ctx, uninstall_payload(MERCHANT_URL)).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
}

use std::sync::atomic::{AtomicU32, Ordering};

use marketplace_engine::db_types::OrderSide;
use shopify_admin::ShopifyApiError;

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handler_tests::mocks::{
        bundle,
        ctx,
        order,
        order_payload,
        store,
        transient_error,
        variant_node,
        MockDb,
        MockRemote,
        MARKETPLACE_URL,
        MERCHANT_URL,
    },
    handlers::{order_cancelled, order_created, order_paid},
};

#[tokio::test]
async fn duplicate_order_create_makes_no_remote_calls_and_no_writes() {
    let mut db = MockDb::new();
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_order_exists().returning(|_| Ok(Some(7)));
    db.expect_insert_mirrored_order().never();
    // A fresh MockRemote panics on any call, so this also proves no remote traffic happens.
    let ctx = ctx(db, MockDb::new(), MockRemote::new());

    let payload = order_payload("gid://shopify/Order/100", "paid");
    let outcome = order_created(&ctx, MARKETPLACE_URL, payload).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::AlreadyProcessed);
}

#[tokio::test]
async fn order_create_from_a_non_marketplace_store_is_refused() {
    let mut db = MockDb::new();
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    let ctx = ctx(db, MockDb::new(), MockRemote::new());

    let payload = order_payload("gid://shopify/Order/100", "paid");
    let err = order_created(&ctx, MERCHANT_URL, payload).await.unwrap_err();
    assert!(matches!(err, HandlerError::PreconditionFailed(_)));
}

#[tokio::test]
async fn missing_variant_mapping_aborts_before_any_write() {
    let mut db = MockDb::new();
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_order_exists().returning(|_| Ok(None));
    db.expect_fetch_bundle_by_product_id()
        .returning(|_| Ok(Some(bundle(5, 2, "gid://shopify/Product/11", 2500))));
    db.expect_fetch_store_by_id().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));
    db.expect_fetch_box_inventory().returning(|_| Ok(vec![]));
    db.expect_fetch_variant_mapping().returning(|_, _| Ok(None));
    db.expect_insert_mirrored_order().never();

    let mut remote = MockRemote::new();
    remote
        .expect_fetch_variant_product()
        .returning(|_, _| Ok(variant_node("gid://shopify/ProductVariant/1", "gid://shopify/Product/11", "25.00")));
    remote.expect_place_draft_order().never();

    let ctx = ctx(db, MockDb::new(), remote);
    let payload = order_payload("gid://shopify/Order/100", "pending");
    let err = order_created(&ctx, MARKETPLACE_URL, payload).await.unwrap_err();
    assert!(matches!(err, HandlerError::InvariantViolation(_)));
}

#[tokio::test]
async fn order_paid_mirrors_payment_to_the_counterpart() {
    let mut db = MockDb::new();
    db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_fetch_order_by_order_id().returning(|_| {
        Ok(Some(order("gid://shopify/Order/200", OrderSide::Merchant, 2, Some("gid://shopify/Order/100"))))
    });
    db.expect_mark_order_pair_paid()
        .withf(|merchant, marketplace| {
            merchant.as_str() == "gid://shopify/Order/200" && marketplace.as_str() == "gid://shopify/Order/100"
        })
        .returning(|m, mp| {
            Ok((
                order(m.as_str(), OrderSide::Merchant, 2, Some(mp.as_str())),
                order(mp.as_str(), OrderSide::Marketplace, 1, Some(m.as_str())),
            ))
        });

    let mut remote = MockRemote::new();
    remote
        .expect_mark_order_as_paid()
        .withf(|auth, gid| auth.store_url == MARKETPLACE_URL && gid == "gid://shopify/Order/100")
        .times(1)
        .returning(|_, _| Ok(()));

    let ctx = ctx(db, MockDb::new(), remote);
    let payload = order_payload("gid://shopify/Order/200", "paid");
    let outcome = order_paid(&ctx, MERCHANT_URL, payload).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
}

#[tokio::test]
async fn order_paid_skips_orders_not_placed_through_the_marketplace() {
    let mut db = MockDb::new();
    db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_fetch_order_by_order_id().returning(|_| Ok(None));
    db.expect_mark_order_pair_paid().never();

    let ctx = ctx(db, MockDb::new(), MockRemote::new());
    let payload = order_payload("gid://shopify/Order/999", "paid");
    let outcome = order_paid(&ctx, MERCHANT_URL, payload).await.unwrap();
    assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
}

#[tokio::test]
async fn order_paid_retries_transient_remote_failures() {
    let mut db = MockDb::new();
    db.expect_fetch_active_store().returning(|_| Ok(Some(store(2, MERCHANT_URL, false))));
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_fetch_order_by_order_id().returning(|_| {
        Ok(Some(order("gid://shopify/Order/200", OrderSide::Merchant, 2, Some("gid://shopify/Order/100"))))
    });
    db.expect_mark_order_pair_paid().returning(|m, mp| {
        Ok((
            order(m.as_str(), OrderSide::Merchant, 2, Some(mp.as_str())),
            order(mp.as_str(), OrderSide::Marketplace, 1, Some(m.as_str())),
        ))
    });

    static CALLS: AtomicU32 = AtomicU32::new(0);
    let mut remote = MockRemote::new();
    remote.expect_mark_order_as_paid().times(3).returning(|_, _| {
        if CALLS.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(transient_error())
        } else {
            Ok(())
        }
    });

    let ctx = ctx(db, MockDb::new(), remote);
    let payload = order_payload("gid://shopify/Order/200", "paid");
    let outcome = order_paid(&ctx, MERCHANT_URL, payload).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
    assert_eq!(CALLS.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn order_cancelled_fails_fast_on_permanent_remote_errors() {
    let mut db = MockDb::new();
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_fetch_order_by_order_id().returning(|oid| {
        if oid.as_str() == "gid://shopify/Order/200" {
            Ok(Some(order("gid://shopify/Order/200", OrderSide::Merchant, 2, Some("gid://shopify/Order/100"))))
        } else {
            Ok(Some(order("gid://shopify/Order/100", OrderSide::Marketplace, 1, Some("gid://shopify/Order/200"))))
        }
    });
    db.expect_cancel_order_pair().never();

    let mut remote = MockRemote::new();
    remote
        .expect_cancel_order()
        .times(1)
        .returning(|_, _, _| Err(ShopifyApiError::UserErrors("order is already cancelled".to_string())));

    let ctx = ctx(db, MockDb::new(), remote);
    let payload = order_payload("gid://shopify/Order/200", "refunded");
    let err = order_cancelled(&ctx, MERCHANT_URL, payload).await.unwrap_err();
    assert!(matches!(err, HandlerError::RemoteCall(ShopifyApiError::UserErrors(_))));
}

#[tokio::test]
async fn order_cancelled_updates_both_sides() {
    let mut db = MockDb::new();
    db.expect_fetch_marketplace_store().returning(|| Ok(store(1, MARKETPLACE_URL, true)));
    db.expect_fetch_order_by_order_id().returning(|oid| {
        if oid.as_str() == "gid://shopify/Order/200" {
            Ok(Some(order("gid://shopify/Order/200", OrderSide::Merchant, 2, Some("gid://shopify/Order/100"))))
        } else {
            Ok(Some(order("gid://shopify/Order/100", OrderSide::Marketplace, 1, Some("gid://shopify/Order/200"))))
        }
    });
    db.expect_cancel_order_pair()
        .withf(|merchant, marketplace, _| {
            merchant.as_str() == "gid://shopify/Order/200" && marketplace.as_str() == "gid://shopify/Order/100"
        })
        .times(1)
        .returning(|m, mp, _| {
            Ok((
                order(m.as_str(), OrderSide::Merchant, 2, Some(mp.as_str())),
                order(mp.as_str(), OrderSide::Marketplace, 1, Some(m.as_str())),
            ))
        });

    let mut remote = MockRemote::new();
    remote
        .expect_cancel_order()
        .withf(|auth, gid, options| {
            auth.store_url == MARKETPLACE_URL && gid == "gid://shopify/Order/100" && options.refund && options.restock
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let ctx = ctx(db, MockDb::new(), remote);
    let payload = order_payload("gid://shopify/Order/200", "refunded");
    let outcome = order_cancelled(&ctx, MERCHANT_URL, payload).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Processed);
}

mod support;

use chrono::Utc;
use dmg_common::Money;
use marketplace_engine::{
    db_types::{
        BundleLine,
        FulfillmentUpdate,
        NewMerchantOrder,
        NewMirroredOrder,
        NewUser,
        OrderId,
        OrderSide,
        OrderStatusType,
        PaymentStatusType,
    },
    events::EventProducers,
    traits::OrderFlowError,
    OrderSyncApi,
};
use support::{count_rows, new_order, prepare_db, seed_box, seed_bundle, seed_store, seed_store_box};

fn single_merchant_order(
    marketplace_id: i64,
    merchant_id: i64,
    bundle_id: i64,
    amount: Money,
    quantity: i64,
) -> NewMirroredOrder {
    NewMirroredOrder {
        marketplace_order: new_order(
            "gid://shopify/Order/100",
            OrderSide::Marketplace,
            marketplace_id,
            amount,
            Some("gid://shopify/Order/200"),
        ),
        merchant_orders: vec![NewMerchantOrder {
            order: new_order(
                "gid://shopify/Order/200",
                OrderSide::Merchant,
                merchant_id,
                amount,
                Some("gid://shopify/Order/100"),
            ),
            bundles: vec![BundleLine { bundle_id, quantity, store_box_id: None }],
        }],
    }
}

#[tokio::test]
async fn marketplace_store_selection() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());

    // No stores at all
    assert!(matches!(api.marketplace_store().await, Err(OrderFlowError::NoMarketplaceStore)));

    // An active external merchant is not a marketplace candidate
    seed_store(&db, "merchant.myshopify.com", true, false).await;
    assert!(matches!(api.marketplace_store().await, Err(OrderFlowError::NoMarketplaceStore)));

    // An inactive internal store is not a candidate either
    seed_store(&db, "old-marketplace.myshopify.com", false, true).await;
    assert!(matches!(api.marketplace_store().await, Err(OrderFlowError::NoMarketplaceStore)));

    let id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let store = api.marketplace_store().await.expect("marketplace should resolve");
    assert_eq!(store.id, id);
    assert_eq!(store.store_url, "marketplace.myshopify.com");

    // A second active internal store makes the invariant ambiguous
    seed_store(&db, "imposter.myshopify.com", true, true).await;
    assert!(matches!(api.marketplace_store().await, Err(OrderFlowError::AmbiguousMarketplaceStore(2))));
}

#[tokio::test]
async fn mirrored_order_commits_both_sides() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let marketplace_id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let merchant_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let bundle_id = seed_bundle(&db, merchant_id, "gid://shopify/Product/11", Money::from_cents(2500), 10, None).await;

    let order = single_merchant_order(marketplace_id, merchant_id, bundle_id, Money::from_cents(5000), 2);
    let mirrored = api.process_mirrored_order(order).await.expect("order should commit");

    assert_eq!(mirrored.marketplace_order.side, OrderSide::Marketplace);
    assert_eq!(mirrored.merchant_orders.len(), 1);
    let merchant = &mirrored.merchant_orders[0];
    assert_eq!(merchant.side, OrderSide::Merchant);
    assert_eq!(merchant.counterpart_order_id, Some(mirrored.marketplace_order.order_id.clone()));
    assert_eq!(mirrored.marketplace_order.counterpart_order_id, Some(merchant.order_id.clone()));
    assert_eq!(count_rows(&db, "orders").await, 2);
    assert_eq!(count_rows(&db, "order_bundles").await, 2);

    // The bundle inventory mirror was decremented by the ordered quantity
    let (inventory,): (i64,) = sqlx::query_as("SELECT inventory FROM bundles WHERE id = $1")
        .bind(bundle_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(inventory, 8);
}

#[tokio::test]
async fn multi_merchant_cart_creates_one_row_per_merchant() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let marketplace_id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let merchant_a = seed_store(&db, "candles.myshopify.com", true, false).await;
    let merchant_b = seed_store(&db, "soaps.myshopify.com", true, false).await;
    let bundle_a = seed_bundle(&db, merchant_a, "gid://shopify/Product/11", Money::from_cents(2500), 10, None).await;
    let bundle_b = seed_bundle(&db, merchant_b, "gid://shopify/Product/12", Money::from_cents(1200), 6, None).await;

    let order = NewMirroredOrder {
        // More than one merchant: the marketplace row carries no single counterpart
        marketplace_order: new_order(
            "gid://shopify/Order/100",
            OrderSide::Marketplace,
            marketplace_id,
            Money::from_cents(3700),
            None,
        ),
        merchant_orders: vec![
            NewMerchantOrder {
                order: new_order(
                    "gid://shopify/Order/200",
                    OrderSide::Merchant,
                    merchant_a,
                    Money::from_cents(2500),
                    Some("gid://shopify/Order/100"),
                ),
                bundles: vec![BundleLine { bundle_id: bundle_a, quantity: 1, store_box_id: None }],
            },
            NewMerchantOrder {
                order: new_order(
                    "gid://shopify/Order/201",
                    OrderSide::Merchant,
                    merchant_b,
                    Money::from_cents(1200),
                    Some("gid://shopify/Order/100"),
                ),
                bundles: vec![BundleLine { bundle_id: bundle_b, quantity: 1, store_box_id: None }],
            },
        ],
    };
    let mirrored = api.process_mirrored_order(order).await.expect("order should commit");
    assert_eq!(mirrored.merchant_orders.len(), 2);
    assert_eq!(count_rows(&db, "orders").await, 3);
    // Marketplace row records every bundle line; each merchant row only its own
    assert_eq!(count_rows(&db, "order_bundles").await, 4);
    for merchant in &mirrored.merchant_orders {
        assert_eq!(merchant.counterpart_order_id.as_ref().map(|c| c.as_str()), Some("gid://shopify/Order/100"));
    }
}

#[tokio::test]
async fn duplicate_remote_order_id_writes_nothing() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let marketplace_id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let merchant_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let bundle_id = seed_bundle(&db, merchant_id, "gid://shopify/Product/11", Money::from_cents(2500), 10, None).await;

    let order = single_merchant_order(marketplace_id, merchant_id, bundle_id, Money::from_cents(2500), 1);
    api.process_mirrored_order(order.clone()).await.expect("first insert should commit");

    // A redelivered webhook produces the exact same order
    let err = api.process_mirrored_order(order).await.expect_err("duplicate must be rejected");
    assert!(matches!(err, OrderFlowError::OrderAlreadyExists(_)));
    assert_eq!(count_rows(&db, "orders").await, 2);
    assert_eq!(count_rows(&db, "order_bundles").await, 2);

    // Inventory was only decremented once
    let (inventory,): (i64,) = sqlx::query_as("SELECT inventory FROM bundles WHERE id = $1")
        .bind(bundle_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(inventory, 9);
}

#[tokio::test]
async fn partial_duplicate_rolls_everything_back() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let marketplace_id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let merchant_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let bundle_id = seed_bundle(&db, merchant_id, "gid://shopify/Product/11", Money::from_cents(1000), 5, None).await;

    let first = single_merchant_order(marketplace_id, merchant_id, bundle_id, Money::from_cents(1000), 1);
    api.process_mirrored_order(first).await.expect("first insert should commit");

    // A fresh marketplace order whose merchant side collides with an existing record
    let second = NewMirroredOrder {
        marketplace_order: new_order(
            "gid://shopify/Order/101",
            OrderSide::Marketplace,
            marketplace_id,
            Money::from_cents(1000),
            Some("gid://shopify/Order/200"),
        ),
        merchant_orders: vec![NewMerchantOrder {
            order: new_order(
                "gid://shopify/Order/200",
                OrderSide::Merchant,
                merchant_id,
                Money::from_cents(1000),
                Some("gid://shopify/Order/101"),
            ),
            bundles: vec![BundleLine { bundle_id, quantity: 1, store_box_id: None }],
        }],
    };
    let err = api.process_mirrored_order(second).await.expect_err("colliding order must be rejected");
    assert!(matches!(err, OrderFlowError::OrderAlreadyExists(_)));

    // The new marketplace side must not have been left behind
    let orphan = api.fetch_order(&OrderId("gid://shopify/Order/101".into())).await.unwrap();
    assert!(orphan.is_none());
    assert_eq!(count_rows(&db, "orders").await, 2);

    // And inventory is untouched by the failed attempt
    let (inventory,): (i64,) = sqlx::query_as("SELECT inventory FROM bundles WHERE id = $1")
        .bind(bundle_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(inventory, 4);
}

#[tokio::test]
async fn packaging_consumes_box_inventory() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let marketplace_id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let merchant_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let box_id = seed_box(&db, "Small gift box", Money::from_cents(299)).await;
    let store_box_id = seed_store_box(&db, merchant_id, box_id, 4, Some("gid://shopify/ProductVariant/77")).await;
    let bundle_id =
        seed_bundle(&db, merchant_id, "gid://shopify/Product/11", Money::from_cents(2500), 10, Some(box_id)).await;

    let inventory = api.box_inventory(merchant_id).await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert!(inventory[0].is_orderable());

    let order = NewMirroredOrder {
        marketplace_order: new_order(
            "gid://shopify/Order/100",
            OrderSide::Marketplace,
            marketplace_id,
            Money::from_cents(8397),
            Some("gid://shopify/Order/200"),
        ),
        merchant_orders: vec![NewMerchantOrder {
            order: new_order(
                "gid://shopify/Order/200",
                OrderSide::Merchant,
                merchant_id,
                Money::from_cents(8397),
                Some("gid://shopify/Order/100"),
            ),
            bundles: vec![BundleLine { bundle_id, quantity: 3, store_box_id: Some(store_box_id) }],
        }],
    };
    api.process_mirrored_order(order).await.expect("order should commit");

    let inventory = api.box_inventory(merchant_id).await.unwrap();
    assert_eq!(inventory[0].remaining, 1);
    assert_eq!(inventory[0].used, 3);
}

#[tokio::test]
async fn paid_cancel_and_fulfill_update_both_sides() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let marketplace_id = seed_store(&db, "marketplace.myshopify.com", true, true).await;
    let merchant_id = seed_store(&db, "merchant.myshopify.com", true, false).await;
    let bundle_id = seed_bundle(&db, merchant_id, "gid://shopify/Product/11", Money::from_cents(2500), 10, None).await;

    let merchant_oid = OrderId("gid://shopify/Order/200".to_string());
    let marketplace_oid = OrderId("gid://shopify/Order/100".to_string());
    let order = single_merchant_order(marketplace_id, merchant_id, bundle_id, Money::from_cents(2500), 1);
    api.process_mirrored_order(order).await.expect("order should commit");

    let (order, counterpart) = api.fetch_order_with_counterpart(&merchant_oid).await.unwrap();
    assert_eq!(order.order_id, merchant_oid);
    assert_eq!(counterpart, marketplace_oid);

    let (merchant, marketplace) = api.mark_order_pair_paid(&merchant_oid, &marketplace_oid).await.unwrap();
    assert_eq!(merchant.payment_status, PaymentStatusType::Paid);
    assert_eq!(marketplace.payment_status, PaymentStatusType::Paid);

    let update = FulfillmentUpdate {
        order_status_url: Some("https://merchant.myshopify.com/orders/status".to_string()),
        tracking_url: Some("https://track.example.com/123".to_string()),
    };
    let (merchant, marketplace) = api.fulfill_order_pair(&merchant_oid, &marketplace_oid, update).await.unwrap();
    assert_eq!(merchant.status, OrderStatusType::Fulfilled);
    assert_eq!(marketplace.status, OrderStatusType::Fulfilled);
    assert_eq!(merchant.tracking_url.as_deref(), Some("https://track.example.com/123"));

    let (merchant, marketplace) = api.cancel_order_pair(&merchant_oid, &marketplace_oid, Utc::now()).await.unwrap();
    assert_eq!(merchant.status, OrderStatusType::Cancelled);
    assert_eq!(merchant.payment_status, PaymentStatusType::Refunded);
    assert!(merchant.cancelled_at.is_some());
    assert_eq!(marketplace.status, OrderStatusType::Cancelled);
}

#[tokio::test]
async fn unknown_orders_and_missing_counterparts_are_distinct() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());
    let merchant_id = seed_store(&db, "merchant.myshopify.com", true, false).await;

    let missing = OrderId("gid://shopify/Order/404".to_string());
    assert!(matches!(api.fetch_order_with_counterpart(&missing).await, Err(OrderFlowError::OrderNotFound(_))));

    // An order written without a counterpart reference is a data inconsistency
    sqlx::query(
        "INSERT INTO orders (order_id, side, store_id, amount, currency, vendor, created_at) VALUES ($1, 'Merchant', $2, 100, 'USD', '', CURRENT_TIMESTAMP)",
    )
    .bind("gid://shopify/Order/500")
    .bind(merchant_id)
    .execute(db.pool())
    .await
    .unwrap();
    let lonely = OrderId("gid://shopify/Order/500".to_string());
    assert!(matches!(api.fetch_order_with_counterpart(&lonely).await, Err(OrderFlowError::MissingCounterpart(_))));
}

#[tokio::test]
async fn buyer_upsert_is_keyed_by_email() {
    let db = prepare_db().await;
    let api = OrderSyncApi::new(db.clone(), EventProducers::default());

    let first = NewUser {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        contact_number: Some("+44 20 7946 0001".to_string()),
        ..Default::default()
    };
    let created = api.upsert_user(first).await.unwrap();

    let update = NewUser {
        name: "Ada King".to_string(),
        email: "ada@example.com".to_string(),
        city: Some("London".to_string()),
        ..Default::default()
    };
    let updated = api.upsert_user(update).await.unwrap();
    assert_eq!(created.id, updated.id);
    assert_eq!(updated.name, "Ada King");
    assert_eq!(updated.city.as_deref(), Some("London"));
    assert_eq!(count_rows(&db, "users").await, 1);
}

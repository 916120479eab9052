//! Wires the engine's event hooks to their side effects.
//!
//! The order flows stay free of notification plumbing: when an order pair lands, the mirrored hook records the
//! merchant-facing notification; when a pair is annulled, the hook leaves an audit trail in the logs.
use log::*;
use marketplace_engine::{
    db_types::NewNotification,
    events::{EventHandlers, EventHooks},
    traits::MarketplaceDatabase,
    SqliteDatabase,
};

pub fn create_notification_handlers(db: SqliteDatabase, buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    // --- On OrderMirrored handler ---
    hooks.on_order_mirrored(move |ev| {
        let db = db.clone();
        Box::pin(async move {
            let store_id = ev.merchant_order.store_id;
            let notification = NewNotification::new_order(store_id);
            match db.insert_notification(notification).await {
                Ok(n) => info!("📣️ Notification {} recorded for store {store_id}", n.id),
                Err(e) => error!("📣️ Could not record the new-order notification for store {store_id}. {e}"),
            }
        })
    });
    // --- On OrderAnnulled handler ---
    hooks.on_order_annulled(move |ev| {
        Box::pin(async move {
            let order = ev.merchant_order;
            info!(
                "📣️ Order [{}] for store {} was annulled. The shopper has been refunded on the marketplace.",
                order.order_id, order.store_id
            );
        })
    });
    EventHandlers::new(buffer_size, hooks)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::Utc;
    use dmg_common::Money;
    use marketplace_engine::{
        db_types::{Order, OrderId, OrderSide, OrderStatusType, PaymentStatusType},
        events::OrderMirroredEvent,
        SqliteDatabase,
    };

    use super::*;

    fn order_for_store(store_id: i64, gid: &str) -> Order {
        Order {
            id: 1,
            order_id: OrderId(gid.to_string()),
            side: OrderSide::Merchant,
            counterpart_order_id: Some(OrderId("gid://shopify/Order/100".to_string())),
            store_id,
            user_id: None,
            amount: Money::from_cents(2500),
            currency: "USD".to_string(),
            discount: Money::default(),
            vendor: "merchant.myshopify.com".to_string(),
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

    #[tokio::test]
    async fn mirrored_hook_records_a_notification() {
        let _ = env_logger::try_init();
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        let store_id: i64 = sqlx::query(
            "INSERT INTO stores (store_url, shop_name, access_token) VALUES ('merchant.myshopify.com', 'merchant', 't')",
        )
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid();

        let handlers = create_notification_handlers(db.clone(), 4);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let event = OrderMirroredEvent::new(
            order_for_store(store_id, "gid://shopify/Order/200"),
            order_for_store(store_id, "gid://shopify/Order/100"),
        );
        for producer in &producers.order_mirrored_producer {
            producer.publish_event(event.clone()).await;
        }
        drop(producers);
        // the hook runs on a spawned task; give it a beat to drain
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE store_id = $1")
            .bind(store_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        let (title,): (String,) = sqlx::query_as("SELECT title FROM notifications WHERE store_id = $1")
            .bind(store_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(title, "You have a new order");
    }
}

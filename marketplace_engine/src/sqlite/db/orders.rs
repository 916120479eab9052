use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{BundleLine, FulfillmentUpdate, NewOrder, Order, OrderId, OrderStatusType, PaymentStatusType},
    traits::OrderFlowError,
};

/// Returns the order row for the given remote order id, if any.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

/// Checks whether an order with the given remote id already exists. Returns its internal id if it does.
pub async fn order_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<i64>, OrderFlowError> {
    let order = fetch_order_by_order_id(order_id, conn).await?;
    Ok(order.map(|o| o.id))
}

/// Inserts a new order row. This is not atomic on its own; embed the call in a transaction and pass `&mut tx` to
/// make a pair of inserts stand or fall together.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let gateways = order.gateways_column();
    let order = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_id,
                side,
                counterpart_order_id,
                store_id,
                user_id,
                amount,
                currency,
                discount,
                vendor,
                payment_status,
                payment_gateways,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.side)
    .bind(order.counterpart_order_id)
    .bind(order.store_id)
    .bind(order.user_id)
    .bind(order.amount.value())
    .bind(order.currency)
    .bind(order.discount.value())
    .bind(order.vendor)
    .bind(order.payment_status)
    .bind(gateways)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {} ({})", order.order_id, order.id, order.side);
    Ok(order)
}

/// Records the bundle lines making up an order.
pub async fn insert_bundle_lines(
    order_db_id: i64,
    lines: &[BundleLine],
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    for line in lines {
        sqlx::query("INSERT INTO order_bundles (order_id, bundle_id, quantity) VALUES ($1, $2, $3)")
            .bind(order_db_id)
            .bind(line.bundle_id)
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn update_payment_status(
    order_id: &OrderId,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(status)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
}

pub async fn cancel_order(
    order_id: &OrderId,
    cancelled_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                payment_status = $2,
                cancelled_at = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $4
            RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Cancelled)
    .bind(PaymentStatusType::Refunded)
    .bind(cancelled_at)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
}

pub async fn fulfill_order(
    order_id: &OrderId,
    update: &FulfillmentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                order_status_url = $2,
                tracking_url = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $4
            RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Fulfilled)
    .bind(update.order_status_url.as_deref())
    .bind(update.tracking_url.as_deref())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
}

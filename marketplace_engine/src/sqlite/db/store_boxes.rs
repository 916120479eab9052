use sqlx::SqliteConnection;

use crate::{db_types::StoreBoxInventory, traits::OrderFlowError};

/// The store's packaging box inventory, joined with the box catalog.
pub async fn box_inventory_for_store(
    store_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StoreBoxInventory>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            store_boxes.id as id,
            store_boxes.store_id as store_id,
            store_boxes.box_id as box_id,
            boxes.name as box_name,
            boxes.price as box_price,
            remaining,
            used,
            shopify_variant_id
        FROM store_boxes JOIN boxes ON store_boxes.box_id = boxes.id
        WHERE store_boxes.store_id = $1"#,
    )
    .bind(store_id)
    .fetch_all(conn)
    .await
}

/// Moves `quantity` boxes from `remaining` to `used` for the given store box row.
pub async fn consume_box(store_box_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), OrderFlowError> {
    sqlx::query("UPDATE store_boxes SET used = used + $1, remaining = remaining - $1 WHERE id = $2")
        .bind(quantity)
        .bind(store_box_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_for_store(store_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM store_boxes WHERE store_id = $1").bind(store_id).execute(conn).await?;
    Ok(result.rows_affected())
}

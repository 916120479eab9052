use sqlx::SqliteConnection;

use crate::db_types::Coupon;

pub async fn coupons_for_store(store_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE store_id = $1 AND is_deleted = 0")
        .bind(store_id)
        .fetch_all(conn)
        .await
}

pub async fn mark_deleted(coupon_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE coupons SET is_deleted = 1 WHERE id = $1").bind(coupon_id).execute(conn).await?;
    Ok(())
}

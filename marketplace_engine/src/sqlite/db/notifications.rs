use sqlx::SqliteConnection;

use crate::db_types::{NewNotification, Notification};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO notifications (store_id, category, title, description) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(notification.store_id)
    .bind(notification.category)
    .bind(notification.title)
    .bind(notification.description)
    .fetch_one(conn)
    .await
}

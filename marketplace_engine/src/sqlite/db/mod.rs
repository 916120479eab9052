pub(crate) mod bundles;
pub(crate) mod coupons;
pub(crate) mod notifications;
pub(crate) mod orders;
pub(crate) mod products;
pub(crate) mod store_boxes;
pub(crate) mod stores;
pub(crate) mod users;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new().max_connections(max_connections).connect(url).await
}

use sqlx::SqliteConnection;

use crate::{db_types::Store, traits::OrderFlowError};

/// Returns the single active, internal store. Zero and multiple candidates are distinct errors, since the second
/// means the one-marketplace invariant has been violated in the data.
pub async fn marketplace_store(conn: &mut SqliteConnection) -> Result<Store, OrderFlowError> {
    let stores: Vec<Store> =
        sqlx::query_as("SELECT * FROM stores WHERE is_active = 1 AND is_internal = 1").fetch_all(conn).await?;
    if stores.len() > 1 {
        return Err(OrderFlowError::AmbiguousMarketplaceStore(stores.len()));
    }
    stores.into_iter().next().ok_or(OrderFlowError::NoMarketplaceStore)
}

pub async fn store_by_url(store_url: &str, conn: &mut SqliteConnection) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stores WHERE store_url = $1").bind(store_url).fetch_optional(conn).await
}

pub async fn active_store_by_url(store_url: &str, conn: &mut SqliteConnection) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stores WHERE store_url = $1 AND is_active = 1")
        .bind(store_url)
        .fetch_optional(conn)
        .await
}

pub async fn store_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stores WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn deactivate_store(id: i64, conn: &mut SqliteConnection) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as("UPDATE stores SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await
}

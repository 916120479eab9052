use sqlx::SqliteConnection;

use crate::{db_types::Bundle, traits::OrderFlowError};

/// Resolves a marketplace-facing product gid to its bundle record, ignoring deleted bundles.
pub async fn bundle_by_product_id(
    product_gid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Bundle>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bundles WHERE shopify_product_id = $1 AND is_deleted = 0")
        .bind(product_gid)
        .fetch_optional(conn)
        .await
}

/// Looks up the merchant-side variant gid for a marketplace variant through the bundle's variant mapping.
pub async fn variant_mapping(
    bundle_id: i64,
    marketplace_variant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    let mapped: Option<(String,)> = sqlx::query_as(
        "SELECT merchant_variant_id FROM bundle_variants WHERE bundle_id = $1 AND marketplace_variant_id = $2",
    )
    .bind(bundle_id)
    .bind(marketplace_variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(mapped.map(|(id,)| id))
}

pub async fn live_bundles_for_store(store_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Bundle>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bundles WHERE store_id = $1 AND is_deleted = 0 AND is_temp = 0")
        .bind(store_id)
        .fetch_all(conn)
        .await
}

/// Reduces a bundle's tracked inventory by the ordered quantity. The count may go negative; the source of truth is
/// the remote storefront and this mirror is advisory.
pub async fn decrement_inventory(
    bundle_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    sqlx::query("UPDATE bundles SET inventory = inventory - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(quantity)
        .bind(bundle_id)
        .execute(conn)
        .await?;
    Ok(())
}

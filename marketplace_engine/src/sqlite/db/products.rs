use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product},
    traits::CatalogError,
};

pub async fn product_by_gid(
    store_id: i64,
    product_gid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE store_id = $1 AND product_id = $2")
        .bind(store_id)
        .bind(product_gid)
        .fetch_optional(conn)
        .await
}

/// Inserts a mirrored product row plus its variant rows. Call within a transaction.
pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    if product_by_gid(product.store_id, &product.product_id, conn).await?.is_some() {
        return Err(CatalogError::ProductAlreadyExists(product.product_id));
    }
    let total_inventory = product.total_inventory();
    let tags = product.tags_column();
    let record = sqlx::query_as::<_, Product>(
        r#"
            INSERT INTO products (
                product_id,
                store_id,
                title,
                handle,
                description,
                body_html,
                vendor,
                product_type,
                tags,
                online_store_url,
                total_inventory,
                total_variants
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(&product.product_id)
    .bind(product.store_id)
    .bind(&product.title)
    .bind(&product.handle)
    .bind(&product.description)
    .bind(&product.body_html)
    .bind(&product.vendor)
    .bind(&product.product_type)
    .bind(tags)
    .bind(&product.online_store_url)
    .bind(total_inventory)
    .bind(product.variants.len() as i64)
    .fetch_one(&mut *conn)
    .await?;
    insert_variants(record.id, &product, conn).await?;
    debug!("📝️ Mirrored product {} for store {} ({} variants)", record.product_id, record.store_id, product.variants.len());
    Ok(record)
}

/// Replaces an existing mirror (product row and all of its variants) with fresh remote data, or inserts it if the
/// product is not mirrored yet. Call within a transaction.
pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    let existing = product_by_gid(product.store_id, &product.product_id, conn).await?;
    let Some(existing) = existing else {
        return insert_product(product, conn).await;
    };
    let total_inventory = product.total_inventory();
    let tags = product.tags_column();
    let record = sqlx::query_as::<_, Product>(
        r#"
            UPDATE products SET
                title = $1,
                handle = $2,
                description = $3,
                body_html = $4,
                vendor = $5,
                product_type = $6,
                tags = $7,
                online_store_url = $8,
                total_inventory = $9,
                total_variants = $10,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $11
            RETURNING *;
        "#,
    )
    .bind(&product.title)
    .bind(&product.handle)
    .bind(&product.description)
    .bind(&product.body_html)
    .bind(&product.vendor)
    .bind(&product.product_type)
    .bind(tags)
    .bind(&product.online_store_url)
    .bind(total_inventory)
    .bind(product.variants.len() as i64)
    .bind(existing.id)
    .fetch_one(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM product_variants WHERE product_id = $1").bind(existing.id).execute(&mut *conn).await?;
    insert_variants(record.id, &product, conn).await?;
    debug!("📝️ Refreshed product mirror {} for store {}", record.product_id, record.store_id);
    Ok(record)
}

async fn insert_variants(
    product_db_id: i64,
    product: &NewProduct,
    conn: &mut SqliteConnection,
) -> Result<(), CatalogError> {
    for variant in &product.variants {
        sqlx::query(
            "INSERT INTO product_variants (product_id, variant_id, title, price, inventory_quantity) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product_db_id)
        .bind(&variant.variant_id)
        .bind(&variant.title)
        .bind(variant.price.value())
        .bind(variant.inventory_quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Removes every mirrored product for a store. Variants are deleted explicitly, rather than through the cascade,
/// so the purge can report both row counts. Returns (products, variants).
pub async fn delete_for_store(store_id: i64, conn: &mut SqliteConnection) -> Result<(u64, u64), sqlx::Error> {
    let variants = sqlx::query(
        "DELETE FROM product_variants WHERE product_id IN (SELECT id FROM products WHERE store_id = $1)",
    )
    .bind(store_id)
    .execute(&mut *conn)
    .await?;
    let products = sqlx::query("DELETE FROM products WHERE store_id = $1").bind(store_id).execute(conn).await?;
    Ok((products.rows_affected(), variants.rows_affected()))
}

use log::*;
use marketplace_engine::traits::{CatalogManagement, MarketplaceDatabase};
use shopify_admin::data_objects::ProductWebhook;

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::{mirror_from_details, HandlerContext},
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

/// A merchant updated a product: refresh the local mirror with the current remote record, creating it if the
/// create webhook never arrived.
pub async fn product_updated<B, R>(
    ctx: &HandlerContext<B, R>,
    shop_domain: &str,
    payload: ProductWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase + CatalogManagement,
    R: RemoteCommerce,
{
    let product_gid = payload.admin_graphql_api_id.clone();
    info!("📦️ Processing products/update for {product_gid}");

    let store = ctx
        .orders
        .active_store(shop_domain)
        .await?
        .ok_or_else(|| HandlerError::PreconditionFailed(format!("store {shop_domain} is not installed or inactive")))?;

    let auth = StoreAuth::from(&store);
    let details = retry_transient(&ctx.retry, || async { Ok(ctx.remote.fetch_product(&auth, &product_gid).await?) })
        .await?
        .ok_or_else(|| HandlerError::NotFound(format!("product {product_gid} on {}", store.store_url)))?;

    let mirror = mirror_from_details(store.id, &details)?;
    ctx.catalog.upsert_product(mirror).await?;
    Ok(HandlerOutcome::Processed)
}

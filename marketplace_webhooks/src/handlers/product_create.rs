use log::*;
use marketplace_engine::traits::{CatalogError, CatalogManagement, MarketplaceDatabase};
use shopify_admin::data_objects::ProductWebhook;

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::{mirror_from_details, HandlerContext},
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

/// A merchant created a product: fetch the full record from their Admin API and mirror it locally.
pub async fn product_created<B, R>(
    ctx: &HandlerContext<B, R>,
    shop_domain: &str,
    payload: ProductWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase + CatalogManagement,
    R: RemoteCommerce,
{
    let product_gid = payload.admin_graphql_api_id.clone();
    info!("📦️ Processing products/create for {product_gid}");

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
    match ctx.catalog.insert_product(mirror).await {
        Ok(_) => Ok(HandlerOutcome::Processed),
        Err(CatalogError::ProductAlreadyExists(gid)) => {
            info!("📦️ Product {gid} is already mirrored. Nothing to do.");
            Ok(HandlerOutcome::AlreadyProcessed)
        },
        Err(e) => Err(e.into()),
    }
}

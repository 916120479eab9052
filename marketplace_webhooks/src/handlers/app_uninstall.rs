use log::*;
use marketplace_engine::traits::{CatalogManagement, MarketplaceDatabase};
use shopify_admin::data_objects::AppUninstalledWebhook;

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::HandlerContext,
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

/// A merchant uninstalled the app: delete their bundle listings from the marketplace storefront and their staging
/// products from their own storefront, retire their coupons, purge the mirrored catalog and deactivate the store.
///
/// Remote deletions are best-effort. The uninstalling store may already have revoked our token, so a failed remote
/// call is logged and teardown continues; the local purge and deactivation always run.
pub async fn app_uninstalled<B, R>(
    ctx: &HandlerContext<B, R>,
    payload: AppUninstalledWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase + CatalogManagement,
    R: RemoteCommerce,
{
    let store_url = payload.myshopify_domain.as_str();
    info!("🧹️ Processing app/uninstalled for {store_url}");

    let store = ctx
        .orders
        .store_by_url(store_url)
        .await?
        .ok_or_else(|| HandlerError::PreconditionFailed(format!("store {store_url} is not installed")))?;
    let marketplace = ctx.orders.marketplace_store().await?;
    let marketplace_auth = StoreAuth::from(&marketplace);
    let merchant_auth = StoreAuth::from(&store);

    let bundles = ctx.catalog.live_bundles(store.id).await?;
    info!("🧹️ Removing {} bundle listing(s) for {store_url}", bundles.len());
    for bundle in &bundles {
        let result = retry_transient(&ctx.retry, || async {
            Ok(ctx.remote.delete_product(&marketplace_auth, &bundle.shopify_product_id).await?)
        })
        .await;
        if let Err(e) = result {
            warn!("🧹️ Could not delete {} from the marketplace storefront. {e}", bundle.shopify_product_id);
        }
        if let Some(vendor_gid) = &bundle.vendor_product_id {
            let result = retry_transient(&ctx.retry, || async {
                Ok(ctx.remote.delete_product(&merchant_auth, vendor_gid).await?)
            })
            .await;
            if let Err(e) = result {
                warn!("🧹️ Could not delete {vendor_gid} from {store_url}. {e}");
            }
        }
    }

    let coupons = ctx.catalog.coupons(store.id).await?;
    for coupon in &coupons {
        let result = retry_transient(&ctx.retry, || async {
            Ok(ctx.remote.delete_discount(&marketplace_auth, &coupon.shopify_id).await?)
        })
        .await;
        match result {
            Ok(()) => ctx.catalog.mark_coupon_deleted(coupon.id).await?,
            Err(e) => warn!("🧹️ Could not delete discount {}. {e}", coupon.shopify_id),
        }
    }

    let purge = ctx.catalog.purge_store_catalog(store.id).await?;
    ctx.catalog.deactivate_store(store.id).await?;
    info!(
        "🧹️ Store {store_url} torn down: {} products, {} variants and {} box rows removed",
        purge.products, purge.variants, purge.store_boxes
    );
    Ok(HandlerOutcome::Processed)
}

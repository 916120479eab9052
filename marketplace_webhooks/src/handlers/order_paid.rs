use log::*;
use marketplace_engine::{db_types::OrderId, traits::MarketplaceDatabase};
use shopify_admin::data_objects::OrderWebhook;

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::HandlerContext,
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

/// A merchant order was paid: mark the marketplace counterpart as paid on the remote platform, then flip both
/// local records to `Paid` together.
pub async fn order_paid<B, R>(
    ctx: &HandlerContext<B, R>,
    shop_domain: &str,
    payload: OrderWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase,
    R: RemoteCommerce,
{
    let order_gid = OrderId(payload.admin_graphql_api_id.clone());
    info!("💰️ Processing orders/paid for [{order_gid}]");

    ctx.orders
        .active_store(shop_domain)
        .await?
        .ok_or_else(|| HandlerError::PreconditionFailed(format!("store {shop_domain} is not installed or inactive")))?;
    let marketplace = ctx.orders.marketplace_store().await?;

    let Some(order) = ctx.orders.fetch_order(&order_gid).await? else {
        // Merchants take direct orders too; those fire the same webhook and are none of our business.
        debug!("💰️ Order [{order_gid}] was not placed through the marketplace.");
        return Ok(HandlerOutcome::Skipped("order was not placed through the marketplace".to_string()));
    };
    let counterpart = order
        .counterpart_order_id
        .clone()
        .ok_or_else(|| HandlerError::InvariantViolation(format!("order [{order_gid}] has no counterpart reference")))?;

    let marketplace_auth = StoreAuth::from(&marketplace);
    retry_transient(&ctx.retry, || async {
        Ok(ctx.remote.mark_order_as_paid(&marketplace_auth, counterpart.as_str()).await?)
    })
    .await?;

    ctx.orders.mark_order_pair_paid(&order.order_id, &counterpart).await?;
    info!("💰️ Order pair [{order_gid}] / [{counterpart}] is now paid");
    Ok(HandlerOutcome::Processed)
}

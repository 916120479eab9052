use chrono::Utc;
use log::*;
use marketplace_engine::{db_types::OrderId, traits::MarketplaceDatabase};
use shopify_admin::{data_objects::OrderWebhook, CancelOptions};

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::HandlerContext,
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

/// A merchant order was cancelled: cancel the marketplace counterpart remotely (refund, restock, notify the
/// shopper), then mark both local records cancelled together.
pub async fn order_cancelled<B, R>(
    ctx: &HandlerContext<B, R>,
    _shop_domain: &str,
    payload: OrderWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase,
    R: RemoteCommerce,
{
    if payload.admin_graphql_api_id.is_empty() {
        return Err(HandlerError::MalformedPayload("the payload carries no order id".to_string()));
    }
    let order_gid = OrderId(payload.admin_graphql_api_id.clone());
    info!("❌️ Processing orders/cancelled for [{order_gid}]");

    let marketplace = ctx.orders.marketplace_store().await?;
    let Some(order) = ctx.orders.fetch_order(&order_gid).await? else {
        debug!("❌️ Order [{order_gid}] was not placed through the marketplace.");
        return Ok(HandlerOutcome::Skipped("order was not placed through the marketplace".to_string()));
    };
    let counterpart = order
        .counterpart_order_id
        .clone()
        .ok_or_else(|| HandlerError::InvariantViolation(format!("order [{order_gid}] has no counterpart reference")))?;
    // The counterpart must exist locally before we touch the remote side.
    ctx.orders
        .fetch_order(&counterpart)
        .await?
        .ok_or_else(|| HandlerError::InvariantViolation(format!("counterpart order [{counterpart}] is missing")))?;

    let marketplace_auth = StoreAuth::from(&marketplace);
    let options = CancelOptions::default();
    retry_transient(&ctx.retry, || async {
        Ok(ctx.remote.cancel_order(&marketplace_auth, counterpart.as_str(), &options).await?)
    })
    .await?;

    ctx.orders.cancel_order_pair(&order.order_id, &counterpart, Utc::now()).await?;
    info!("❌️ Order pair [{order_gid}] / [{counterpart}] cancelled");
    Ok(HandlerOutcome::Processed)
}

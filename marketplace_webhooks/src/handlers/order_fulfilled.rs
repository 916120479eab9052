use log::*;
use marketplace_engine::{
    db_types::{FulfillmentUpdate, OrderId},
    traits::MarketplaceDatabase,
};
use shopify_admin::data_objects::{FulfillmentInput, FulfillmentOrderRef, OrderWebhook, TrackingInfoInput};

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::HandlerContext,
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

/// A merchant shipped: mirror the fulfillment (with tracking details) onto the marketplace order and mark both
/// local records fulfilled together.
pub async fn order_fulfilled<B, R>(
    ctx: &HandlerContext<B, R>,
    shop_domain: &str,
    payload: OrderWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase,
    R: RemoteCommerce,
{
    let order_gid = OrderId(payload.admin_graphql_api_id.clone());
    info!("🚚️ Processing orders/fulfilled for [{order_gid}]");

    ctx.orders
        .active_store(shop_domain)
        .await?
        .ok_or_else(|| HandlerError::PreconditionFailed(format!("store {shop_domain} is not installed or inactive")))?;
    let marketplace = ctx.orders.marketplace_store().await?;

    let Some(order) = ctx.orders.fetch_order(&order_gid).await? else {
        debug!("🚚️ Order [{order_gid}] was not placed through the marketplace.");
        return Ok(HandlerOutcome::Skipped("order was not placed through the marketplace".to_string()));
    };
    let counterpart = order
        .counterpart_order_id
        .clone()
        .ok_or_else(|| HandlerError::InvariantViolation(format!("order [{order_gid}] has no counterpart reference")))?;

    // Tracking details ride on the first fulfillment entry; all of them are optional.
    let fulfillment = payload.fulfillments.first();
    let marketplace_auth = StoreAuth::from(&marketplace);
    let fulfillment_order_id = retry_transient(&ctx.retry, || async {
        Ok(ctx.remote.fulfillment_order_id(&marketplace_auth, counterpart.as_str()).await?)
    })
    .await?
    .ok_or_else(|| {
        HandlerError::PreconditionFailed(format!("marketplace order [{counterpart}] has no fulfillment order"))
    })?;

    let input = FulfillmentInput {
        line_items_by_fulfillment_order: vec![FulfillmentOrderRef { fulfillment_order_id }],
        notify_customer: true,
        tracking_info: fulfillment.map(TrackingInfoInput::from).unwrap_or_default(),
    };
    retry_transient(&ctx.retry, || async { Ok(ctx.remote.create_fulfillment(&marketplace_auth, &input).await?) })
        .await?;

    let update = FulfillmentUpdate {
        order_status_url: payload.order_status_url.clone(),
        tracking_url: fulfillment.and_then(|f| f.tracking_url.clone()),
    };
    ctx.orders.fulfill_order_pair(&order.order_id, &counterpart, update).await?;
    info!("🚚️ Order pair [{order_gid}] / [{counterpart}] fulfilled");
    Ok(HandlerOutcome::Processed)
}

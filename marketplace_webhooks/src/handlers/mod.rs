//! One handler per subscribed webhook topic. Each handler validates its preconditions explicitly, talks to the
//! remote platform through [`RemoteCommerce`], and persists through the engine APIs; every failure is classified
//! (see [`crate::errors::HandlerError`]) rather than swallowed.
mod app_uninstall;
mod order_cancelled;
mod order_create;
mod order_fulfilled;
mod order_paid;
mod product_create;
mod product_update;

pub use app_uninstall::app_uninstalled;
use dmg_common::Money;
use marketplace_engine::{
    db_types::{NewProduct, NewProductVariant},
    CatalogApi,
    OrderSyncApi,
};
pub use order_cancelled::order_cancelled;
pub use order_create::order_created;
pub use order_fulfilled::order_fulfilled;
pub use order_paid::order_paid;
pub use product_create::product_created;
pub use product_update::product_updated;
use shopify_admin::{data_objects::ProductDetails, helpers::parse_shopify_price};

use crate::{errors::HandlerError, retry::RetryConfig};

/// The tag applied to every draft order the gateway stages on a merchant store.
pub const ORDER_TAG: &str = "mirrored_from_marketplace";

/// Everything a handler needs: the engine APIs, the remote commerce client, and the retry policy for transient
/// remote failures.
pub struct HandlerContext<B, R> {
    pub orders: OrderSyncApi<B>,
    pub catalog: CatalogApi<B>,
    pub remote: R,
    pub retry: RetryConfig,
}

/// Builds the local product mirror from a remote product record.
pub(crate) fn mirror_from_details(store_id: i64, details: &ProductDetails) -> Result<NewProduct, HandlerError> {
    let variants = details
        .variants
        .nodes
        .iter()
        .map(|v| {
            Ok(NewProductVariant {
                variant_id: v.id.clone(),
                title: v.title.clone(),
                price: parse_price(&v.price)?,
                inventory_quantity: v.inventory_quantity,
            })
        })
        .collect::<Result<Vec<_>, HandlerError>>()?;
    Ok(NewProduct {
        product_id: details.id.clone(),
        store_id,
        title: details.title.clone(),
        handle: details.handle.clone(),
        description: details.description.clone(),
        body_html: details.description_html.clone(),
        vendor: details.vendor.clone(),
        product_type: details.product_type.clone(),
        tags: details.tags.clone(),
        online_store_url: details.online_store_url.clone(),
        variants,
    })
}

pub(crate) fn parse_price(price: &str) -> Result<Money, HandlerError> {
    parse_shopify_price(price).map_err(|e| HandlerError::MalformedPayload(e.to_string()))
}

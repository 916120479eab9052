use std::collections::BTreeMap;

use dmg_common::Money;

use chrono::{DateTime, Utc};
use log::*;
use marketplace_engine::{
    db_types::{
        Bundle,
        BundleLine,
        NewMerchantOrder,
        NewMirroredOrder,
        NewOrder,
        NewUser,
        OrderId,
        OrderSide,
        PaymentStatusType,
        Store,
    },
    traits::{MarketplaceDatabase, OrderFlowError},
};
use shopify_admin::{
    data_objects::{
        AppliedDiscount,
        DraftOrderInput,
        DraftOrderLineItem,
        LineItemPayload,
        OrderWebhook,
        ShippingAddressInput,
    },
    helpers::shopify_gid,
};

use crate::{
    errors::{HandlerError, HandlerOutcome},
    handlers::{HandlerContext, ORDER_TAG},
    pricing,
    remote::{RemoteCommerce, StoreAuth},
    retry::retry_transient,
};

struct MerchantGroup {
    store: Store,
    lines: Vec<(LineItemPayload, Bundle)>,
}

/// The order reconciliation flow: match marketplace line items to merchant-owned bundles, price each merchant's
/// share, place a draft order on each merchant store, and commit all local records in one transaction.
pub async fn order_created<B, R>(
    ctx: &HandlerContext<B, R>,
    shop_domain: &str,
    payload: OrderWebhook,
) -> Result<HandlerOutcome, HandlerError>
where
    B: MarketplaceDatabase,
    R: RemoteCommerce,
{
    let order_gid = OrderId(payload.admin_graphql_api_id.clone());
    info!("🛒️ Processing orders/create for [{order_gid}]");

    let marketplace = ctx.orders.marketplace_store().await?;
    if marketplace.store_url != shop_domain {
        return Err(HandlerError::PreconditionFailed(format!(
            "orders/create was delivered for {shop_domain}, which is not the marketplace storefront"
        )));
    }
    // Idempotency: a redelivered webhook must not touch the remote platform or the database again.
    if ctx.orders.order_exists(&order_gid).await?.is_some() {
        info!("🛒️ Order [{order_gid}] already exists in the database. Nothing to do.");
        return Ok(HandlerOutcome::AlreadyProcessed);
    }
    if payload.line_items.is_empty() {
        return Err(HandlerError::PreconditionFailed("the order has no line items".to_string()));
    }
    let created_at = payload
        .created_at
        .parse::<DateTime<Utc>>()
        .map_err(|e| HandlerError::MalformedPayload(format!("invalid created_at: {e}")))?;

    let user_id = upsert_buyer(ctx, &payload).await?;

    // Group the bundle lines by owning merchant. Lines that don't resolve to a bundle are not ours to mirror.
    let mut groups: BTreeMap<i64, MerchantGroup> = BTreeMap::new();
    for item in &payload.line_items {
        let Some(product_id) = item.product_id else {
            warn!("🛒️ [{order_gid}] has a line item without a product id. Skipping the line.");
            continue;
        };
        let product_gid = shopify_gid("Product", product_id);
        let Some(bundle) = ctx.orders.bundle_by_product_id(&product_gid).await? else {
            debug!("🛒️ {product_gid} is not a bundle. Skipping the line.");
            continue;
        };
        let store = ctx.orders.store_by_id(bundle.store_id).await?.ok_or_else(|| {
            HandlerError::InvariantViolation(format!("bundle {} does not belong to a known store", bundle.id))
        })?;
        groups.entry(store.id).or_insert_with(|| MerchantGroup { store, lines: Vec::new() }).lines.push((item.clone(), bundle));
    }
    if groups.is_empty() {
        return Ok(HandlerOutcome::Skipped("no line items resolve to a bundle".to_string()));
    }

    let marketplace_auth = StoreAuth::from(&marketplace);
    let payment_status = PaymentStatusType::from_financial_status(&payload.financial_status);
    let payment_pending = payment_status != PaymentStatusType::Paid;

    let mut merchant_orders = Vec::with_capacity(groups.len());
    let mut total_amount = Money::default();
    let mut total_discount = Money::default();
    for group in groups.into_values() {
        let priced = price_merchant_group(ctx, &marketplace_auth, &group).await?;
        let input = DraftOrderInput {
            line_items: priced.draft_lines,
            email: payload.customer.as_ref().and_then(|c| c.email.clone()),
            shipping_address: payload.billing_address.as_ref().map(ShippingAddressInput::from),
            tags: ORDER_TAG.to_string(),
        };
        // Draft order staging is not idempotent, so it is deliberately outside the retry wrapper.
        let merchant_auth = StoreAuth::from(&group.store);
        let merchant_gid = ctx.remote.place_draft_order(&merchant_auth, &input, payment_pending).await?;
        info!("🛒️ Placed merchant order [{merchant_gid}] on {}", group.store.store_url);
        total_amount += priced.amount;
        total_discount += priced.discount;
        merchant_orders.push(NewMerchantOrder {
            order: NewOrder {
                order_id: OrderId(merchant_gid),
                side: OrderSide::Merchant,
                counterpart_order_id: Some(order_gid.clone()),
                store_id: group.store.id,
                user_id,
                amount: priced.amount,
                currency: payload.currency.clone(),
                discount: priced.discount,
                vendor: group.store.store_url.clone(),
                payment_status,
                payment_gateways: payload.payment_gateway_names.clone(),
                created_at,
            },
            bundles: priced.bundle_lines,
        });
    }

    // With a single merchant the marketplace row cross-references it directly; a split cart has no single
    // counterpart and the merchant rows carry the references instead.
    let counterpart = match merchant_orders.as_slice() {
        [only] => Some(only.order.order_id.clone()),
        _ => None,
    };
    let marketplace_order = NewOrder {
        order_id: order_gid.clone(),
        side: OrderSide::Marketplace,
        counterpart_order_id: counterpart,
        store_id: marketplace.id,
        user_id,
        amount: total_amount,
        currency: payload.currency.clone(),
        discount: total_discount,
        vendor: marketplace.store_url.clone(),
        payment_status,
        payment_gateways: payload.payment_gateway_names.clone(),
        created_at,
    };
    match ctx.orders.process_mirrored_order(NewMirroredOrder { marketplace_order, merchant_orders }).await {
        Ok(mirrored) => {
            info!(
                "🛒️ Order [{order_gid}] mirrored onto {} merchant store(s) for {}",
                mirrored.merchant_orders.len(),
                mirrored.marketplace_order.amount
            );
            Ok(HandlerOutcome::Processed)
        },
        Err(OrderFlowError::OrderAlreadyExists(id)) => {
            info!("🛒️ Order [{id}] was recorded concurrently. Nothing to do.");
            Ok(HandlerOutcome::AlreadyProcessed)
        },
        Err(e) => Err(e.into()),
    }
}

async fn upsert_buyer<B, R>(ctx: &HandlerContext<B, R>, payload: &OrderWebhook) -> Result<Option<i64>, HandlerError>
where
    B: MarketplaceDatabase,
    R: RemoteCommerce,
{
    let Some(customer) = payload.customer.as_ref() else {
        return Ok(None);
    };
    let Some(email) = customer.email.clone() else {
        return Ok(None);
    };
    let address = payload.billing_address.as_ref();
    let user = NewUser {
        name: customer.full_name(),
        email,
        contact_number: customer.phone.clone(),
        address_line1: address.and_then(|a| a.address1.clone()),
        address_line2: address.and_then(|a| a.address2.clone()),
        city: address.and_then(|a| a.city.clone()),
        country: address.and_then(|a| a.country.clone()),
        pincode: address.and_then(|a| a.zip.clone()),
    };
    let user = ctx.orders.upsert_user(user).await?;
    Ok(Some(user.id))
}

struct PricedGroup {
    draft_lines: Vec<DraftOrderLineItem>,
    bundle_lines: Vec<BundleLine>,
    amount: Money,
    discount: Money,
}

/// Prices one merchant's share of the order and builds its draft order lines. A bundle variant that cannot be
/// mapped to a merchant variant aborts the whole webhook before anything is written anywhere.
async fn price_merchant_group<B, R>(
    ctx: &HandlerContext<B, R>,
    marketplace_auth: &StoreAuth,
    group: &MerchantGroup,
) -> Result<PricedGroup, HandlerError>
where
    B: MarketplaceDatabase,
    R: RemoteCommerce,
{
    let boxes = ctx.orders.box_inventory(group.store.id).await?;
    let mut draft_lines = Vec::new();
    let mut bundle_lines = Vec::new();
    let mut amount = Money::default();
    let mut discount_total = Money::default();
    for (item, bundle) in &group.lines {
        let Some(variant_id) = item.variant_id else {
            return Err(HandlerError::MalformedPayload("a bundle line item has no variant id".to_string()));
        };
        let variant_gid = shopify_gid("ProductVariant", variant_id);
        let variant = retry_transient(&ctx.retry, || async {
            Ok(ctx.remote.fetch_variant_product(marketplace_auth, &variant_gid).await?)
        })
        .await?;
        if variant.product.id != bundle.shopify_product_id {
            return Err(HandlerError::InvariantViolation(format!(
                "variant {} belongs to {}, not to bundle product {}",
                variant.id, variant.product.id, bundle.shopify_product_id
            )));
        }
        let merchant_variant = ctx.orders.variant_mapping(bundle.id, &variant.id).await?.ok_or_else(|| {
            HandlerError::InvariantViolation(format!(
                "bundle {} has no merchant variant mapped for {}",
                bundle.id, variant.id
            ))
        })?;
        let discount = pricing::summed_discount(&item.discount_allocations)?;
        let store_box = if item.wants_packaging() {
            boxes.iter().find(|b| Some(b.box_id) == bundle.box_id && b.is_orderable())
        } else {
            None
        };
        if let Some(sb) = store_box {
            if let Some(box_variant) = &sb.shopify_variant_id {
                draft_lines.push(DraftOrderLineItem {
                    variant_id: box_variant.clone(),
                    quantity: item.quantity,
                    applied_discount: None,
                });
            }
        }
        let price = pricing::price_line(bundle.price, item.quantity, store_box.map(|b| b.box_price), discount);
        amount += price.total();
        discount_total += discount;
        let applied_discount = if discount.is_zero() { None } else { Some(AppliedDiscount::fixed(discount)) };
        draft_lines.push(DraftOrderLineItem { variant_id: merchant_variant, quantity: item.quantity, applied_discount });
        bundle_lines.push(BundleLine {
            bundle_id: bundle.id,
            quantity: item.quantity,
            store_box_id: store_box.map(|b| b.id),
        });
    }
    Ok(PricedGroup { draft_lines, bundle_lines, amount, discount: discount_total })
}

use dmg_common::Money;

use crate::ShopifyApiError;

/// Shopify expresses prices as decimal strings ("24.99"). Parse one into cents.
pub fn parse_shopify_price(price: &str) -> Result<Money, ShopifyApiError> {
    price.parse::<Money>().map_err(|e| ShopifyApiError::InvalidCurrencyAmount(e.to_string()))
}

/// Render an amount back into the decimal form the Admin API expects.
pub fn shopify_price(amount: Money) -> String {
    amount.to_price_string()
}

/// Builds the `gid://shopify/<kind>/<id>` form of a numeric webhook id. Webhook payloads carry numeric ids for line
/// items, but the GraphQL Admin API only accepts gids.
pub fn shopify_gid(kind: &str, id: i64) -> String {
    format!("gid://shopify/{kind}/{id}")
}

#[cfg(test)]
mod test {
    use dmg_common::Money;

    use super::*;

    #[test]
    fn price_round_trip() {
        let price = parse_shopify_price("149.95").unwrap();
        assert_eq!(price, Money::from_cents(14995));
        assert_eq!(shopify_price(price), "149.95");
    }

    #[test]
    fn gid_form() {
        assert_eq!(shopify_gid("ProductVariant", 42), "gid://shopify/ProductVariant/42");
        assert_eq!(shopify_gid("Product", 7), "gid://shopify/Product/7");
    }
}

//! Price aggregation for mirrored merchant orders.
//!
//! A merchant order's amount is the sum over its lines of: bundle price × quantity, plus the packaging box
//! surcharge × quantity when the shopper asked for packaging, minus the line's discount allocations (forwarded to
//! the draft order as a fixed-amount discount).
use dmg_common::Money;
use shopify_admin::{data_objects::DiscountAllocation, helpers::parse_shopify_price};

use crate::errors::HandlerError;

/// The priced components of one order line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinePrice {
    pub subtotal: Money,
    pub surcharge: Money,
    pub discount: Money,
}

impl LinePrice {
    pub fn total(&self) -> Money {
        self.subtotal + self.surcharge - self.discount
    }
}

pub fn price_line(bundle_price: Money, quantity: i64, box_price: Option<Money>, discount: Money) -> LinePrice {
    let subtotal = bundle_price * quantity;
    let surcharge = box_price.map(|p| p * quantity).unwrap_or_default();
    LinePrice { subtotal, surcharge, discount }
}

/// Sums a line item's discount allocations. Shopify sends the amounts as decimal strings.
pub fn summed_discount(allocations: &[DiscountAllocation]) -> Result<Money, HandlerError> {
    let mut total = Money::default();
    for allocation in allocations {
        total = total
            + parse_shopify_price(&allocation.amount)
                .map_err(|e| HandlerError::MalformedPayload(format!("invalid discount allocation: {e}")))?;
    }
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;

    fn allocation(amount: &str) -> DiscountAllocation {
        DiscountAllocation { amount: amount.to_string() }
    }

    #[test]
    fn line_price_aggregates_bundle_box_and_discount() {
        // 2 × 25.00 bundle + 2 × 2.99 box − 5.00 discount = 50.98
        let price = price_line(Money::from_cents(2500), 2, Some(Money::from_cents(299)), Money::from_cents(500));
        assert_eq!(price.subtotal, Money::from_cents(5000));
        assert_eq!(price.surcharge, Money::from_cents(598));
        assert_eq!(price.total(), Money::from_cents(5098));
    }

    #[test]
    fn line_price_without_packaging() {
        let price = price_line(Money::from_cents(1899), 3, None, Money::default());
        assert_eq!(price.total(), Money::from_cents(5697));
    }

    #[test]
    fn discount_allocations_are_summed() {
        let total = summed_discount(&[allocation("5.00"), allocation("1.25"), allocation("0.75")]).unwrap();
        assert_eq!(total, Money::from_cents(700));
        assert_eq!(summed_discount(&[]).unwrap(), Money::default());
    }

    #[test]
    fn malformed_discounts_are_rejected() {
        let err = summed_discount(&[allocation("five dollars")]);
        assert!(matches!(err, Err(HandlerError::MalformedPayload(_))));
    }
}

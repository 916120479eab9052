use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money         ---------------------------------------------------------

/// A monetary amount in minor units (cents). Shopify expresses prices as decimal strings, so all arithmetic in the
/// gateway happens in cents and amounts are only rendered back to decimal form at the API boundary.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct MoneyConversionError(pub String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("{value} is too large")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

/// Parses a Shopify decimal price string ("24.99") into cents. At most two decimal places are honoured, matching
/// what the Admin API emits.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let whole = parts
            .next()
            .ok_or_else(|| MoneyConversionError(s.to_string()))?
            .parse::<i64>()
            .map_err(|e| MoneyConversionError(format!("Invalid price value: {s}. {e}.")))?;
        let cents = match parts.next() {
            None => 0,
            Some(frac) => {
                let frac = if frac.len() > 2 { &frac[..2] } else { frac };
                let v = frac.parse::<i64>().map_err(|e| MoneyConversionError(format!("Invalid price value: {s}. {e}.")))?;
                if frac.len() == 1 {
                    v * 10
                } else {
                    v
                }
            },
        };
        if parts.next().is_some() {
            return Err(MoneyConversionError(format!("Invalid price value: {s}.")));
        }
        let sign = if whole < 0 { -1 } else { 1 };
        Ok(Self(whole * 100 + sign * cents))
    }
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Renders the amount as a Shopify decimal price string.
    pub fn to_price_string(&self) -> String {
        format!("{self}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_price_strings() {
        assert_eq!("24.99".parse::<Money>().unwrap(), Money::from_cents(2499));
        assert_eq!("24".parse::<Money>().unwrap(), Money::from_cents(2400));
        assert_eq!("24.5".parse::<Money>().unwrap(), Money::from_cents(2450));
        assert_eq!("0.05".parse::<Money>().unwrap(), Money::from_cents(5));
        assert!("24.99.1".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn arithmetic_and_display() {
        let total = Money::from_cents(1000) + Money::from_cents(250) - Money::from_cents(50);
        assert_eq!(total, Money::from_cents(1200));
        assert_eq!(total.to_price_string(), "12.00");
        assert_eq!(Money::from_cents(-105).to_price_string(), "-1.05");
        assert_eq!(Money::from_cents(550) * 3, Money::from_cents(1650));
        let sum: Money = vec![Money::from_cents(100), Money::from_cents(23)].into_iter().sum();
        assert_eq!(sum, Money::from_cents(123));
    }
}

//! Coupon discount calculation.

use crate::cart::{Cart, PricingRules};
use crate::catalog::{Coupon, CouponKind};
use crate::error::CommerceError;
use crate::money::Money;

/// The amount `coupon` takes off a cart whose discounted subtotal is
/// `cart_total`.
///
/// The result is capped at the coupon's `max_discount` and never exceeds
/// `cart_total` or drops below zero. Eligibility is not checked here.
pub fn discount_amount(
    coupon: &Coupon,
    cart_total: Money,
    cart: &Cart,
) -> Result<Money, CommerceError> {
    let currency = cart_total.currency;
    let raw = match &coupon.kind {
        CouponKind::Fixed { amount } => {
            if amount.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: amount.currency.code().to_string(),
                });
            }
            *amount
        }
        CouponKind::Percentage { percent } => cart_total.percentage(*percent),
        CouponKind::Category { percent, categories } => {
            let category_subtotal = cart
                .lines_in(categories)
                .map(PricingRules::line_total)
                .try_fold(Money::zero(currency), |acc, line| acc.try_add(&line?))?;
            category_subtotal.percentage(*percent)
        }
    };

    let capped = match coupon.max_discount {
        Some(cap) => raw.cap_at(cap),
        None => raw,
    };
    Ok(capped.cap_at(cart_total).floor_at_zero())
}

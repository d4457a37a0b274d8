//! Cart pricing rules and the order summary they produce.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartLine};
use crate::catalog::Product;
use crate::config::PricingConfig;
use crate::coupon::Eligibility;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;

/// Line, tax and delivery rules for one deployment's [`PricingConfig`].
///
/// All rules assume well-formed input: positive prices, discounts within
/// 0-100 and quantities of at least 1. [`Product::validate`],
/// [`Cart::add`] and [`Cart::validate`] enforce that at the boundary.
#[derive(Debug, Clone, Copy)]
pub struct PricingRules<'a> {
    config: &'a PricingConfig,
}

impl<'a> PricingRules<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        Self { config }
    }

    /// Unit price after the product's own discount.
    pub fn effective_price(product: &Product) -> Money {
        if product.discount_percent > 0.0 {
            product.price.scale(1.0 - product.discount_percent / 100.0)
        } else {
            product.price
        }
    }

    /// Effective unit price times quantity, rounded once for the whole line.
    pub fn line_total(line: &CartLine) -> Result<Money, CommerceError> {
        let product = &line.product;
        if product.discount_percent > 0.0 {
            let factor = (1.0 - product.discount_percent / 100.0) * line.quantity as f64;
            Ok(product.price.scale(factor))
        } else {
            product.price.try_multiply(line.quantity as i64)
        }
    }

    /// List price times quantity, ignoring product discounts.
    pub fn original_line_total(line: &CartLine) -> Result<Money, CommerceError> {
        line.product.price.try_multiply(line.quantity as i64)
    }

    /// Sum of discounted line totals. Zero for an empty cart.
    pub fn subtotal(&self, cart: &Cart) -> Result<Money, CommerceError> {
        self.sum_lines(cart.lines.iter(), Self::line_total)
    }

    /// Sum of undiscounted line totals.
    pub fn original_subtotal(&self, cart: &Cart) -> Result<Money, CommerceError> {
        self.sum_lines(cart.lines.iter(), Self::original_line_total)
    }

    /// Sum of `line_total` over the given lines.
    pub fn sum_lines<'c>(
        &self,
        lines: impl Iterator<Item = &'c CartLine>,
        price: fn(&CartLine) -> Result<Money, CommerceError>,
    ) -> Result<Money, CommerceError> {
        lines
            .map(price)
            .try_fold(self.config.zero(), |acc, line| acc.try_add(&line?))
    }

    pub fn tax(&self, subtotal: Money) -> Money {
        subtotal.scale(self.config.tax_rate)
    }

    /// Free at or above the threshold, else the standard or express charge.
    pub fn delivery_charge(&self, subtotal: Money, express: bool) -> Result<Money, CommerceError> {
        let short_by = self.config.free_delivery_threshold().try_subtract(&subtotal)?;
        if !short_by.is_positive() {
            return Ok(self.config.zero());
        }
        Ok(if express {
            self.config.express_delivery()
        } else {
            self.config.standard_delivery()
        })
    }

    /// Base minutes plus a slot for every started block of items.
    pub fn estimated_delivery_minutes(&self, cart: &Cart, express: bool) -> u32 {
        let base = if express {
            self.config.express_delivery_minutes
        } else {
            self.config.standard_delivery_minutes
        };
        let slot = self.config.items_per_delivery_slot.max(1) as u64;
        let slots = (cart.item_count() + slot - 1) / slot;
        let extra = slots.saturating_mul(self.config.minutes_per_delivery_slot as u64);
        base.saturating_add(u32::try_from(extra).unwrap_or(u32::MAX))
    }

    /// E.g. "Express delivery: 35 minutes (by 2:35 PM)".
    pub fn estimated_delivery_text(
        &self,
        cart: &Cart,
        express: bool,
        now: NaiveDateTime,
    ) -> String {
        let minutes = self.estimated_delivery_minutes(cart, express);
        let arrival = now + Duration::minutes(minutes as i64);
        let label = if express {
            "Express delivery"
        } else {
            "Estimated delivery"
        };
        format!(
            "{}: {} minutes (by {})",
            label,
            minutes,
            arrival.format("%-I:%M %p")
        )
    }
}

/// Complete pricing breakdown for a cart. Derived on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    /// Sum of quantities.
    pub item_count: u64,
    /// Subtotal at list prices.
    pub original_subtotal: Money,
    /// What product-level discounts already took off.
    pub product_savings: Money,
    /// Subtotal after product discounts.
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_charge: Money,
    pub express_delivery: bool,
    /// The applied coupon and whether the current cart still qualifies.
    pub coupon: Option<AppliedCouponStatus>,
    /// Zero when no coupon is applied or it no longer qualifies.
    pub coupon_discount: Money,
    /// subtotal + tax + delivery - coupon discount.
    pub total: Money,
    pub estimated_delivery_minutes: u32,
    pub lines: Vec<LinePricing>,
}

impl OrderSummary {
    /// Product discounts plus the coupon discount.
    pub fn savings(&self) -> Result<Money, CommerceError> {
        Money::try_sum(
            [&self.product_savings, &self.coupon_discount].into_iter(),
            self.total.currency,
        )
    }

    pub fn is_free_delivery(&self) -> bool {
        self.delivery_charge.is_zero()
    }
}

/// The coupon attached to a cart at summary time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedCouponStatus {
    pub code: String,
    pub eligibility: Eligibility,
}

/// Pricing for a single cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinePricing {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub effective_unit_price: Money,
    pub line_total: Money,
}

impl LinePricing {
    pub fn for_line(line: &CartLine) -> Result<Self, CommerceError> {
        Ok(Self {
            product_id: line.product.id.clone(),
            name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price: line.product.price,
            effective_unit_price: PricingRules::effective_price(&line.product),
            line_total: PricingRules::line_total(line)?,
        })
    }
}

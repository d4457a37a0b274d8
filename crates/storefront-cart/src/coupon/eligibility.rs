//! Coupon eligibility classification.
//!
//! Eligibility is never stored: it is recomputed from the current cart,
//! the customer's history and today's date on every query.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::catalog::{normalize_code, Category, Coupon, CouponKind};
use crate::config::PricingConfig;
use crate::money::Money;

/// Eligibility tier, ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Applicable,
    /// Short of the minimum order by no more than the near-miss window.
    Almost,
    NotApplicable,
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Applicable => "applicable",
            Eligibility::Almost => "almost",
            Eligibility::NotApplicable => "not_applicable",
        }
    }
}

/// Facts about the customer that coupon rules depend on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerContext {
    /// Codes consumed by this customer's completed orders.
    pub used_coupons: HashSet<String>,
    /// True until the customer completes an order.
    pub is_first_order: bool,
}

impl CustomerContext {
    pub fn first_time() -> Self {
        Self {
            used_coupons: HashSet::new(),
            is_first_order: true,
        }
    }

    pub fn returning() -> Self {
        Self::default()
    }

    pub fn with_used(mut self, code: &str) -> Self {
        self.used_coupons.insert(normalize_code(code));
        self
    }

    pub fn has_used(&self, code: &str) -> bool {
        self.used_coupons.contains(&normalize_code(code))
    }
}

/// The specific rule that keeps a coupon from applying.
///
/// `Display` gives the message shown when the customer tries the code;
/// [`Ineligibility::reason`] gives the wording used in offer listings.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ineligibility {
    #[error("This coupon is no longer active")]
    Inactive,

    #[error("This coupon has expired")]
    Expired,

    #[error("This coupon has already been used")]
    AlreadyUsed,

    #[error("This coupon is only valid for first-time customers")]
    FirstOrderOnly,

    #[error("Minimum order value of {} required", compact(.minimum))]
    BelowMinimum { minimum: Money, shortfall: Money },

    #[error("This coupon requires items from: {}", join_categories(.categories))]
    CategoryMismatch { categories: Vec<Category> },
}

impl Ineligibility {
    /// Offer-listing wording; points at the shortfall instead of the minimum.
    pub fn reason(&self) -> String {
        match self {
            Ineligibility::BelowMinimum { shortfall, .. } => format!(
                "Add {} more to qualify for this offer",
                shortfall.display_compact()
            ),
            other => other.to_string(),
        }
    }
}

fn compact(amount: &Money) -> String {
    amount.display_compact()
}

fn join_categories(categories: &[Category]) -> String {
    categories
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of classifying one coupon against one cart.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub eligibility: Eligibility,
    /// The rule that fired; `None` only when applicable.
    pub blocker: Option<Ineligibility>,
}

impl Assessment {
    fn applicable() -> Self {
        Self {
            eligibility: Eligibility::Applicable,
            blocker: None,
        }
    }

    fn blocked(eligibility: Eligibility, blocker: Ineligibility) -> Self {
        Self {
            eligibility,
            blocker: Some(blocker),
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.eligibility == Eligibility::Applicable
    }

    /// Human-readable reason matching the rule that fired.
    pub fn reason(&self) -> String {
        match &self.blocker {
            Some(blocker) => blocker.reason(),
            None => "Eligible for this offer".to_string(),
        }
    }
}

/// Classifies coupons for one customer on one day.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityEvaluator<'a> {
    customer: &'a CustomerContext,
    today: NaiveDate,
    near_miss_window: Money,
}

impl<'a> EligibilityEvaluator<'a> {
    pub fn new(config: &PricingConfig, customer: &'a CustomerContext, today: NaiveDate) -> Self {
        Self {
            customer,
            today,
            near_miss_window: config.near_miss_window(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn customer(&self) -> &'a CustomerContext {
        self.customer
    }

    /// Apply the rules in order; the first that matches decides.
    ///
    /// `cart_total` is the subtotal after product discounts.
    pub fn assess(&self, coupon: &Coupon, cart: &Cart, cart_total: Money) -> Assessment {
        let blocker = if !coupon.is_active() {
            Some(Ineligibility::Inactive)
        } else if coupon.is_expired(self.today) {
            Some(Ineligibility::Expired)
        } else if self.customer.has_used(&coupon.code) {
            Some(Ineligibility::AlreadyUsed)
        } else if coupon.first_order_only && !self.customer.is_first_order {
            Some(Ineligibility::FirstOrderOnly)
        } else {
            None
        };
        if let Some(blocker) = blocker {
            return Assessment::blocked(Eligibility::NotApplicable, blocker);
        }

        if cart_total.amount_minor < coupon.min_order_value.amount_minor {
            let shortfall = Money::new(
                coupon.min_order_value.amount_minor - cart_total.amount_minor,
                cart_total.currency,
            );
            let tier = if shortfall.amount_minor <= self.near_miss_window.amount_minor {
                Eligibility::Almost
            } else {
                Eligibility::NotApplicable
            };
            return Assessment::blocked(
                tier,
                Ineligibility::BelowMinimum {
                    minimum: coupon.min_order_value,
                    shortfall,
                },
            );
        }

        if let CouponKind::Category { categories, .. } = &coupon.kind {
            if !categories.is_empty() && !cart.has_category_in(categories) {
                return Assessment::blocked(
                    Eligibility::NotApplicable,
                    Ineligibility::CategoryMismatch {
                        categories: categories.clone(),
                    },
                );
            }
        }

        Assessment::applicable()
    }

    pub fn eligibility(&self, coupon: &Coupon, cart: &Cart, cart_total: Money) -> Eligibility {
        self.assess(coupon, cart, cart_total).eligibility
    }

    pub fn eligibility_reason(&self, coupon: &Coupon, cart: &Cart, cart_total: Money) -> String {
        self.assess(coupon, cart, cart_total).reason()
    }
}

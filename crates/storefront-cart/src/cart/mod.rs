//! Shopping cart module.
//!
//! Contains the cart state, pricing rules and the order summary.

mod cart;
mod pricing;

pub use cart::{Cart, CartLine, MAX_QUANTITY_PER_LINE};
pub use pricing::{AppliedCouponStatus, LinePricing, OrderSummary, PricingRules};

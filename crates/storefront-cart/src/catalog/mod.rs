//! Catalog module.
//!
//! Products and categories as read from the storefront, and the coupon
//! catalog.

mod coupon;
mod product;

pub use coupon::{normalize_code, Coupon, CouponCatalog, CouponKind, CouponRecord};
pub use product::{Category, Product};

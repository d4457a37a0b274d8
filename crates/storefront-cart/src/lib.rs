//! Cart, pricing and coupon engine for the storefront.
//!
//! - **Pricing**: effective prices, subtotal, tax, tiered delivery and
//!   delivery-time estimates
//! - **Coupons**: a catalog of fixed, percentage and category offers, the
//!   eligibility rules that gate them and the discount they give
//! - **Recommendations**: every offer scored against the cart, plus the single
//!   best pick with an explanation
//! - **Engine**: one session's cart tied to a customer history and a clock
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_cart::prelude::*;
//!
//! let mut engine = CartEngine::new(
//!     SessionId::generate(),
//!     Arc::new(CouponCatalog::storefront_defaults(Currency::INR)),
//!     Arc::new(InMemoryHistory::new()),
//!     Arc::new(SystemClock),
//!     PricingConfig::default(),
//! );
//!
//! let apple = Product::new("1", "Apple", Category::Fruits, Money::from_major(50, Currency::INR));
//! engine.add_item(apple, 2).unwrap();
//!
//! let summary = engine.summary().unwrap();
//! assert_eq!(summary.total.display(), "\u{20b9}168.00");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod engine;

pub use engine::{CartEngine, CouponApplication, OrderReceipt};
pub use error::{CommerceError, ConfigError, Rejection};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::PricingConfig;
    pub use crate::engine::{CartEngine, CouponApplication, OrderReceipt};
    pub use crate::error::{CommerceError, ConfigError, Rejection};
    pub use crate::history::{CustomerHistory, CustomerRecord, InMemoryHistory};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{Category, Coupon, CouponCatalog, CouponKind, CouponRecord, Product};

    // Cart
    pub use crate::cart::{
        AppliedCouponStatus, Cart, CartLine, LinePricing, OrderSummary, PricingRules,
    };

    // Coupons
    pub use crate::coupon::{
        discount_amount, filter_by_category, offer_stats, Assessment, CouponRecommender,
        CouponSuggestion, CustomerContext, Eligibility, EligibilityEvaluator, Ineligibility,
        OfferStats, Recommendation,
    };
}

//! Coupon eligibility, discounts and recommendations.

mod discount;
mod eligibility;
mod recommend;

pub use discount::discount_amount;
pub use eligibility::{
    Assessment, CustomerContext, Eligibility, EligibilityEvaluator, Ineligibility,
};
pub use recommend::{
    filter_by_category, offer_stats, CouponRecommender, CouponSuggestion, OfferStats,
    Recommendation,
};

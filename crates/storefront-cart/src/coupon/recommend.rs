//! Coupon suggestions and the smart recommendation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::catalog::{Category, Coupon, CouponCatalog, CouponKind};
use crate::config::PricingConfig;
use crate::coupon::{discount_amount, Eligibility, EligibilityEvaluator};
use crate::error::CommerceError;
use crate::money::Money;

const BASE_SCORE: f64 = 50.0;
const APPLICABLE_BONUS: f64 = 30.0;
const ALMOST_BONUS: f64 = 15.0;
const CATEGORY_MATCH_BONUS: f64 = 20.0;
const CATEGORY_SHARE_MAX: f64 = 20.0;
const DISCOUNT_SHARE_MAX: f64 = 25.0;
const URGENCY_BONUS: f64 = 10.0;

const DISCOUNT_WEIGHT: f64 = 0.6;
const RELEVANCE_WEIGHT: f64 = 0.4;
const MAX_ALTERNATIVES: usize = 2;

/// One catalog coupon, scored against the current cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponSuggestion {
    pub code: String,
    pub description: String,
    pub kind: CouponKind,
    pub min_order_value: Money,
    pub max_discount: Option<Money>,
    pub applicable_categories: Vec<Category>,
    pub eligibility: Eligibility,
    /// What the coupon would take off the cart as it stands.
    pub potential_discount: Money,
    /// Ranking signal in [0, 100].
    pub relevance_score: f64,
    /// `None` for coupons without an expiry date.
    pub days_until_expiry: Option<i64>,
    pub is_applied: bool,
    pub is_used: bool,
    pub eligibility_reason: String,
    /// How much more the cart needs to reach the minimum order.
    pub amount_needed: Money,
    /// `amount_needed` as a percentage of the minimum order.
    pub percentage_to_go: f64,
}

impl CouponSuggestion {
    fn recommendation_score(&self) -> f64 {
        DISCOUNT_WEIGHT * self.potential_discount.to_decimal()
            + RELEVANCE_WEIGHT * self.relevance_score
    }

    /// One-line pitch for this coupon.
    pub fn explanation(&self) -> String {
        match self.eligibility {
            Eligibility::Applicable => format!(
                "We recommend {} - you'll save {} on this order!",
                self.code,
                self.potential_discount.display_rounded()
            ),
            Eligibility::Almost => format!(
                "Add {} more to unlock {} and save {}!",
                self.amount_needed.display_compact(),
                self.code,
                self.potential_discount.display_rounded()
            ),
            Eligibility::NotApplicable => format!("{}: {}", self.code, self.eligibility_reason),
        }
    }
}

/// The single best offer for the cart plus runners-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub top: Option<CouponSuggestion>,
    pub alternatives: Vec<CouponSuggestion>,
    pub explanation: String,
}

/// Headline numbers for an offers page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferStats {
    pub total: usize,
    pub ready_to_use: usize,
    /// Sum of potential discounts over applicable coupons.
    pub max_savings: Money,
}

/// Scores every catalog coupon against a cart.
pub struct CouponRecommender<'a> {
    catalog: &'a CouponCatalog,
    evaluator: EligibilityEvaluator<'a>,
    config: &'a PricingConfig,
    applied: Option<&'a str>,
}

impl<'a> CouponRecommender<'a> {
    pub fn new(
        catalog: &'a CouponCatalog,
        evaluator: EligibilityEvaluator<'a>,
        config: &'a PricingConfig,
        applied: Option<&'a str>,
    ) -> Self {
        Self {
            catalog,
            evaluator,
            config,
            applied,
        }
    }

    /// Every coupon, applicable first, then almost, then the rest; larger
    /// discounts first within a tier.
    pub fn suggested_coupons(
        &self,
        cart: &Cart,
        cart_total: Money,
    ) -> Result<Vec<CouponSuggestion>, CommerceError> {
        let mut suggestions = self
            .catalog
            .iter()
            .map(|coupon| self.suggest(coupon, cart, cart_total))
            .collect::<Result<Vec<_>, _>>()?;

        suggestions.sort_by(|a, b| {
            a.eligibility
                .cmp(&b.eligibility)
                .then_with(|| {
                    b.potential_discount
                        .amount_minor
                        .cmp(&a.potential_discount.amount_minor)
                })
        });
        Ok(suggestions)
    }

    /// Pick the best applicable coupon not already applied.
    ///
    /// Falls back to the best coupon the customer has not used or applied,
    /// whatever its tier.
    pub fn smart_recommendation(
        &self,
        cart: &Cart,
        cart_total: Money,
    ) -> Result<Recommendation, CommerceError> {
        let suggestions = self.suggested_coupons(cart, cart_total)?;

        let mut candidates: Vec<CouponSuggestion> = suggestions
            .iter()
            .filter(|s| s.eligibility == Eligibility::Applicable && !s.is_applied)
            .cloned()
            .collect();

        if candidates.is_empty() {
            let mut fallback = suggestions.into_iter().filter(|s| !s.is_used && !s.is_applied);
            return Ok(match fallback.next() {
                Some(top) => Recommendation {
                    explanation: top.explanation(),
                    top: Some(top),
                    alternatives: fallback.take(MAX_ALTERNATIVES).collect(),
                },
                None => Recommendation {
                    top: None,
                    alternatives: Vec::new(),
                    explanation: "No offers available for your current cart".to_string(),
                },
            });
        }

        candidates.sort_by(|a, b| {
            b.recommendation_score()
                .partial_cmp(&a.recommendation_score())
                .unwrap_or(Ordering::Equal)
        });
        let mut ranked = candidates.into_iter();
        let top = ranked.next();
        Ok(Recommendation {
            explanation: top.as_ref().map(CouponSuggestion::explanation).unwrap_or_default(),
            top,
            alternatives: ranked.take(MAX_ALTERNATIVES).collect(),
        })
    }

    fn suggest(
        &self,
        coupon: &Coupon,
        cart: &Cart,
        cart_total: Money,
    ) -> Result<CouponSuggestion, CommerceError> {
        let assessment = self.evaluator.assess(coupon, cart, cart_total);
        let potential_discount = discount_amount(coupon, cart_total, cart)?;
        let days_until_expiry = coupon.days_until_expiry(self.evaluator.today());
        let relevance_score = self.relevance_score(
            coupon,
            cart,
            cart_total,
            assessment.eligibility,
            potential_discount,
            days_until_expiry,
        );

        let amount_needed = coupon
            .min_order_value
            .try_subtract(&cart_total)?
            .floor_at_zero();
        let percentage_to_go = if amount_needed.is_positive() {
            amount_needed.ratio_of(&coupon.min_order_value) * 100.0
        } else {
            0.0
        };

        Ok(CouponSuggestion {
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            kind: coupon.kind.clone(),
            min_order_value: coupon.min_order_value,
            max_discount: coupon.max_discount,
            applicable_categories: coupon.applicable_categories().to_vec(),
            eligibility: assessment.eligibility,
            potential_discount,
            relevance_score,
            days_until_expiry,
            is_applied: self.applied == Some(coupon.code.as_str()),
            is_used: self.evaluator.customer().has_used(&coupon.code),
            eligibility_reason: assessment.reason(),
            amount_needed,
            percentage_to_go,
        })
    }

    fn relevance_score(
        &self,
        coupon: &Coupon,
        cart: &Cart,
        cart_total: Money,
        eligibility: Eligibility,
        discount: Money,
        days_until_expiry: Option<i64>,
    ) -> f64 {
        let mut score = BASE_SCORE;

        score += match eligibility {
            Eligibility::Applicable => APPLICABLE_BONUS,
            Eligibility::Almost => ALMOST_BONUS,
            Eligibility::NotApplicable => 0.0,
        };

        let categories = coupon.applicable_categories();
        if !categories.is_empty() {
            let matching = cart.lines_in(categories).count();
            if matching > 0 {
                let share = matching as f64 / cart.line_count() as f64 * 100.0;
                score += CATEGORY_MATCH_BONUS + share.min(CATEGORY_SHARE_MAX);
            }
        }

        score += (discount.ratio_of(&cart_total) * 100.0).min(DISCOUNT_SHARE_MAX);

        if days_until_expiry.map_or(false, |days| days <= self.config.expiry_urgency_days) {
            score += URGENCY_BONUS;
        }

        score.clamp(0.0, 100.0)
    }
}

/// Count and total the offers a customer can use right now.
pub fn offer_stats(suggestions: &[CouponSuggestion]) -> OfferStats {
    let ready: Vec<&CouponSuggestion> = suggestions
        .iter()
        .filter(|s| s.eligibility == Eligibility::Applicable)
        .collect();
    let currency = suggestions
        .first()
        .map(|s| s.potential_discount.currency)
        .unwrap_or_default();
    OfferStats {
        total: suggestions.len(),
        ready_to_use: ready.len(),
        max_savings: Money::new(
            ready.iter().map(|s| s.potential_discount.amount_minor).sum(),
            currency,
        ),
    }
}

/// Suggestions restricted to `category`, plus those with no restriction.
pub fn filter_by_category(
    suggestions: &[CouponSuggestion],
    category: Category,
) -> Vec<&CouponSuggestion> {
    suggestions
        .iter()
        .filter(|s| {
            s.applicable_categories.is_empty() || s.applicable_categories.contains(&category)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::coupon::CustomerContext;
    use crate::money::Currency;
    use chrono::NaiveDate;

    fn rs(amount: i64) -> Money {
        Money::from_major(amount, Currency::INR)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn cart(lines: &[(Category, i64)]) -> (Cart, Money) {
        let mut cart = Cart::new();
        let mut total = 0;
        for (i, (category, price)) in lines.iter().enumerate() {
            cart.add(Product::new(i.to_string(), "Item", *category, rs(*price)), 1)
                .unwrap();
            total += price;
        }
        (cart, rs(total))
    }

    fn suggestions_for(
        cart: &Cart,
        total: Money,
        customer: &CustomerContext,
        applied: Option<&str>,
    ) -> Vec<CouponSuggestion> {
        let config = PricingConfig::default();
        let catalog = CouponCatalog::storefront_defaults(Currency::INR);
        let evaluator = EligibilityEvaluator::new(&config, customer, today());
        CouponRecommender::new(&catalog, evaluator, &config, applied)
            .suggested_coupons(cart, total)
            .unwrap()
    }

    fn recommend(
        cart: &Cart,
        total: Money,
        customer: &CustomerContext,
        applied: Option<&str>,
    ) -> Recommendation {
        let config = PricingConfig::default();
        let catalog = CouponCatalog::storefront_defaults(Currency::INR);
        let evaluator = EligibilityEvaluator::new(&config, customer, today());
        CouponRecommender::new(&catalog, evaluator, &config, applied)
            .smart_recommendation(cart, total)
            .unwrap()
    }

    #[test]
    fn test_suggestions_sorted_by_tier_then_discount() {
        let (cart, total) = cart(&[(Category::Fruits, 300), (Category::Dairy, 120)]);
        let customer = CustomerContext::first_time();
        let suggestions = suggestions_for(&cart, total, &customer, None);

        assert_eq!(suggestions.len(), 5);
        for pair in suggestions.windows(2) {
            assert!(pair[0].eligibility <= pair[1].eligibility);
            if pair[0].eligibility == pair[1].eligibility {
                assert!(
                    pair[0].potential_discount.amount_minor
                        >= pair[1].potential_discount.amount_minor
                );
            }
        }

        // 420 total: FRESH15 (45), WELCOME50 (50), DAIRY10 (12), SNACKS25 (25) are applicable,
        // SAVE20 is 80 short.
        let codes: Vec<&str> = suggestions.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["WELCOME50", "FRESH15", "SNACKS25", "DAIRY10", "SAVE20"]);
        assert_eq!(suggestions[4].eligibility, Eligibility::Almost);
        assert_eq!(suggestions[4].amount_needed, rs(80));
        assert!((suggestions[4].percentage_to_go - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_score_components() {
        let (cart, total) = cart(&[(Category::Fruits, 300)]);
        let customer = CustomerContext::first_time();
        let suggestions = suggestions_for(&cart, total, &customer, None);
        let fresh = suggestions.iter().find(|s| s.code == "FRESH15").unwrap();

        // 50 base + 30 applicable + 20 match + 20 share (capped) + 15 discount share, clamped.
        assert_eq!(fresh.relevance_score, 100.0);

        let save = suggestions.iter().find(|s| s.code == "SAVE20").unwrap();
        // 50 base, no tier bonus (200 short), discount 60/300 = 20.
        assert_eq!(save.eligibility, Eligibility::NotApplicable);
        assert!((save.relevance_score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_score_urgency() {
        let config = PricingConfig::default();
        let catalog = CouponCatalog::new(vec![Coupon::new(
            "SOON",
            "",
            CouponKind::Percentage { percent: 1.0 },
            Currency::INR,
        )
        .with_min_order(rs(10_000))
        .expires_on(NaiveDate::from_ymd_opt(2026, 6, 5).unwrap())])
        .unwrap();
        let customer = CustomerContext::first_time();
        let evaluator = EligibilityEvaluator::new(&config, &customer, today());
        let (cart, total) = cart(&[(Category::Snacks, 100)]);

        let suggestions = CouponRecommender::new(&catalog, evaluator, &config, None)
            .suggested_coupons(&cart, total)
            .unwrap();
        assert_eq!(suggestions[0].days_until_expiry, Some(4));
        assert!((suggestions[0].relevance_score - 61.0).abs() < 1e-9);
    }

    #[test]
    fn test_smart_recommendation_prefers_weighted_best() {
        let (cart, total) = cart(&[(Category::Fruits, 300), (Category::Dairy, 120)]);
        let customer = CustomerContext::first_time();
        let rec = recommend(&cart, total, &customer, None);

        let top = rec.top.unwrap();
        assert_eq!(top.eligibility, Eligibility::Applicable);
        assert_eq!(rec.alternatives.len(), 2);
        assert!(rec.explanation.starts_with(&format!("We recommend {}", top.code)));
        assert!(rec.alternatives.iter().all(|a| a.code != top.code));
        assert!(rec
            .alternatives
            .iter()
            .all(|a| a.recommendation_score() <= top.recommendation_score()));
    }

    #[test]
    fn test_smart_recommendation_skips_applied() {
        let (cart, total) = cart(&[(Category::Fruits, 300)]);
        let customer = CustomerContext::returning();
        let rec = recommend(&cart, total, &customer, Some("FRESH15"));

        let top = rec.top.unwrap();
        assert_ne!(top.code, "FRESH15");
        assert_eq!(top.code, "SNACKS25");
    }

    #[test]
    fn test_smart_recommendation_falls_back_to_almost() {
        let (cart, total) = cart(&[(Category::Snacks, 60)]);
        let customer = CustomerContext::returning();
        let rec = recommend(&cart, total, &customer, None);

        // Only SNACKS25 (40 short) and DAIRY10 (90 short) are within reach.
        let top = rec.top.unwrap();
        assert_eq!(top.code, "SNACKS25");
        assert_eq!(top.eligibility, Eligibility::Almost);
        assert_eq!(rec.explanation, "Add \u{20b9}40 more to unlock SNACKS25 and save \u{20b9}25!");
        assert_eq!(rec.alternatives.len(), 2);
    }

    #[test]
    fn test_no_offers_when_everything_used() {
        let (cart, total) = cart(&[(Category::Snacks, 60)]);
        let customer = ["SAVE20", "FRESH15", "WELCOME50", "DAIRY10", "SNACKS25"]
            .iter()
            .fold(CustomerContext::first_time(), |c, code| c.with_used(code));
        let rec = recommend(&cart, total, &customer, None);

        assert!(rec.top.is_none());
        assert!(rec.alternatives.is_empty());
        assert_eq!(rec.explanation, "No offers available for your current cart");
    }

    #[test]
    fn test_not_applicable_explanation_uses_reason() {
        let (cart, total) = cart(&[(Category::Dairy, 600)]);
        let customer = CustomerContext::returning();
        let suggestions = suggestions_for(&cart, total, &customer, None);
        let fresh = suggestions.iter().find(|s| s.code == "FRESH15").unwrap();

        assert_eq!(
            fresh.explanation(),
            "FRESH15: This coupon requires items from: Fruits, Vegetables"
        );
    }

    #[test]
    fn test_offer_stats_and_filter() {
        let (cart, total) = cart(&[(Category::Fruits, 300), (Category::Dairy, 120)]);
        let customer = CustomerContext::first_time();
        let suggestions = suggestions_for(&cart, total, &customer, None);

        let stats = offer_stats(&suggestions);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.ready_to_use, 4);
        assert_eq!(stats.max_savings, rs(45 + 50 + 12 + 25));

        let dairy: Vec<&str> = filter_by_category(&suggestions, Category::Dairy)
            .iter()
            .map(|s| s.code.as_str())
            .collect();
        assert!(dairy.contains(&"DAIRY10"));
        assert!(dairy.contains(&"SAVE20"));
        assert!(!dairy.contains(&"FRESH15"));
    }
}

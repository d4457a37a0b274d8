//! Cart engine: one shopping session's cart wired to pricing, coupons and
//! customer history.
//!
//! Every query recomputes from the current cart; nothing derived is cached.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cart::{AppliedCouponStatus, Cart, CartLine, LinePricing, OrderSummary, PricingRules};
use crate::catalog::{normalize_code, CouponCatalog, Product};
use crate::clock::Clock;
use crate::config::PricingConfig;
use crate::coupon::{
    discount_amount, offer_stats, CouponRecommender, CouponSuggestion, CustomerContext, Eligibility,
    EligibilityEvaluator, OfferStats, Recommendation,
};
use crate::error::{CommerceError, Rejection};
use crate::history::CustomerHistory;
use crate::ids::{OrderId, ProductId, SessionId};
use crate::money::Money;

/// Result of a successful [`CartEngine::apply_coupon`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponApplication {
    pub code: String,
    pub discount: Money,
    /// The coupon this one replaced, if any.
    pub replaced: Option<String>,
}

/// Snapshot taken by [`CartEngine::complete_order`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub session: SessionId,
    pub placed_at: NaiveDateTime,
    pub summary: OrderSummary,
    /// Code consumed by this order.
    pub coupon_used: Option<String>,
}

/// A shopping session's cart and the collaborators needed to price it.
///
/// Owned by one session; callers serialize access to a given engine. The
/// catalog and history are shared between engines.
pub struct CartEngine {
    session: SessionId,
    cart: Cart,
    catalog: Arc<CouponCatalog>,
    history: Arc<dyn CustomerHistory>,
    clock: Arc<dyn Clock>,
    config: PricingConfig,
}

impl CartEngine {
    /// Start an empty cart for `session`.
    pub fn new(
        session: SessionId,
        catalog: Arc<CouponCatalog>,
        history: Arc<dyn CustomerHistory>,
        clock: Arc<dyn Clock>,
        config: PricingConfig,
    ) -> Self {
        Self {
            session,
            cart: Cart::new(),
            catalog,
            history,
            clock,
            config,
        }
    }

    /// Resume a persisted cart.
    ///
    /// The cart is checked with [`Cart::validate`] first, so stored data
    /// that breaks the cart rules is refused with `InvalidInput`.
    pub fn with_cart(mut self, cart: Cart) -> Result<Self, CommerceError> {
        if let Err(err) = cart.validate() {
            warn!(session = %self.session, error = %err, "stored cart rejected");
            return Err(err);
        }
        self.cart = cart;
        Ok(self)
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CouponCatalog {
        &self.catalog
    }

    /// Hand the cart back for persistence.
    pub fn into_cart(self) -> Cart {
        self.cart
    }

    // Cart mutations

    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// Returns the line's new quantity.
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<u32, CommerceError> {
        let product_id = product.id.clone();
        let new_quantity = self.cart.add(product, quantity)?;
        debug!(
            session = %self.session,
            product = %product_id,
            quantity = new_quantity,
            "item added"
        );
        Ok(new_quantity)
    }

    /// Remove a product's line. `ItemNotFound` leaves the cart unchanged.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<CartLine, CommerceError> {
        let line = self.cart.remove(product_id)?;
        debug!(session = %self.session, product = %product_id, "item removed");
        Ok(line)
    }

    /// Set a line's quantity; zero or below removes it.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<u32>, CommerceError> {
        let result = self.cart.set_quantity(product_id, quantity)?;
        debug!(session = %self.session, product = %product_id, quantity = ?result, "quantity set");
        Ok(result)
    }

    /// Empty the cart and drop the applied coupon.
    pub fn clear(&mut self) {
        self.cart.clear();
        debug!(session = %self.session, "cart cleared");
    }

    pub fn set_express_delivery(&mut self, express: bool) {
        self.cart.express_delivery = express;
        debug!(session = %self.session, express, "delivery mode set");
    }

    // Coupons

    /// Validate `code` against the current cart and make it the applied
    /// coupon, replacing any other.
    ///
    /// Only an `applicable` coupon is accepted. On rejection the cart is
    /// unchanged and the error carries the customer-facing reason.
    pub fn apply_coupon(&mut self, code: &str) -> Result<CouponApplication, CommerceError> {
        let code = normalize_code(code);
        let Some(coupon) = self.catalog.find_by_code(&code) else {
            warn!(session = %self.session, code = %code, "unknown coupon code");
            return Err(Rejection::UnknownCode(code).into());
        };

        let subtotal = self.subtotal()?;
        let customer = self.customer_context();
        let evaluator = EligibilityEvaluator::new(&self.config, &customer, self.clock.today());
        let assessment = evaluator.assess(coupon, &self.cart, subtotal);
        if let Some(blocker) = assessment.blocker {
            warn!(
                session = %self.session,
                code = %code,
                eligibility = assessment.eligibility.as_str(),
                reason = %blocker,
                "coupon rejected"
            );
            return Err(Rejection::Ineligible(blocker).into());
        }

        let discount = discount_amount(coupon, subtotal, &self.cart)?;
        let replaced = self
            .cart
            .applied_coupon
            .replace(coupon.code.clone())
            .filter(|previous| previous != &coupon.code);
        info!(session = %self.session, code = %coupon.code, discount = %discount, "coupon applied");

        Ok(CouponApplication {
            code: coupon.code.clone(),
            discount,
            replaced,
        })
    }

    /// Detach the applied coupon, returning its code.
    pub fn remove_coupon(&mut self) -> Result<String, CommerceError> {
        let code = self.cart.applied_coupon.take().ok_or(CommerceError::NoCouponApplied)?;
        info!(session = %self.session, code = %code, "coupon removed");
        Ok(code)
    }

    /// Move `code` into the customer's used set.
    ///
    /// Called by the checkout flow once an order is placed. If `code` is the
    /// applied coupon it is detached. Fails with `AlreadyUsed` when another
    /// order consumed it first.
    pub fn mark_coupon_used(&mut self, code: &str) -> Result<(), CommerceError> {
        let code = normalize_code(code);
        self.history.consume_coupon(&self.session, &code)?;
        if self.cart.applied_coupon.as_deref() == Some(code.as_str()) {
            self.cart.applied_coupon = None;
        }
        Ok(())
    }

    /// Place the order: snapshot the summary, consume the applied coupon if
    /// it still qualifies, record the order and clear the cart.
    ///
    /// Nothing changes if the cart is empty or the coupon was consumed
    /// concurrently.
    pub fn complete_order(&mut self) -> Result<OrderReceipt, CommerceError> {
        if self.cart.is_empty() {
            return Err(CommerceError::InvalidInput(
                "cannot complete an order with an empty cart".to_string(),
            ));
        }

        let summary = self.summary()?;
        let coupon_used = match &summary.coupon {
            Some(status) if status.eligibility == Eligibility::Applicable => {
                self.mark_coupon_used(&status.code)?;
                Some(status.code.clone())
            }
            _ => None,
        };

        self.history.record_order(&self.session);
        self.cart.clear();

        let receipt = OrderReceipt {
            order_id: OrderId::generate(),
            session: self.session.clone(),
            placed_at: self.clock.now(),
            summary,
            coupon_used,
        };
        info!(
            session = %self.session,
            order = %receipt.order_id,
            total = %receipt.summary.total,
            coupon = ?receipt.coupon_used,
            "order completed"
        );
        Ok(receipt)
    }

    // Queries

    /// Subtotal after product discounts; the base for tax, delivery and
    /// coupon rules.
    pub fn subtotal(&self) -> Result<Money, CommerceError> {
        PricingRules::new(&self.config).subtotal(&self.cart)
    }

    pub fn customer_context(&self) -> CustomerContext {
        self.history.context(&self.session)
    }

    /// Full pricing breakdown for the cart as it stands.
    ///
    /// The applied coupon is re-checked; it contributes a discount only
    /// while it is still applicable.
    pub fn summary(&self) -> Result<OrderSummary, CommerceError> {
        let rules = PricingRules::new(&self.config);
        let express = self.cart.express_delivery;

        let subtotal = rules.subtotal(&self.cart)?;
        let original_subtotal = rules.original_subtotal(&self.cart)?;
        let product_savings = original_subtotal.try_subtract(&subtotal)?;
        let tax = rules.tax(subtotal);
        let delivery_charge = rules.delivery_charge(subtotal, express)?;
        let (coupon, coupon_discount) = self.applied_coupon_discount(subtotal)?;

        let total = subtotal
            .try_add(&tax)?
            .try_add(&delivery_charge)?
            .try_subtract(&coupon_discount)?;

        let lines = self
            .cart
            .lines
            .iter()
            .map(LinePricing::for_line)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OrderSummary {
            item_count: self.cart.item_count(),
            original_subtotal,
            product_savings,
            subtotal,
            tax,
            delivery_charge,
            express_delivery: express,
            coupon,
            coupon_discount,
            total,
            estimated_delivery_minutes: rules.estimated_delivery_minutes(&self.cart, express),
            lines,
        })
    }

    /// Every catalog coupon scored against the cart.
    pub fn suggested_coupons(&self) -> Result<Vec<CouponSuggestion>, CommerceError> {
        let subtotal = self.subtotal()?;
        let customer = self.customer_context();
        self.recommender(&customer).suggested_coupons(&self.cart, subtotal)
    }

    pub fn smart_recommendation(&self) -> Result<Recommendation, CommerceError> {
        let subtotal = self.subtotal()?;
        let customer = self.customer_context();
        self.recommender(&customer).smart_recommendation(&self.cart, subtotal)
    }

    pub fn offer_stats(&self) -> Result<OfferStats, CommerceError> {
        Ok(offer_stats(&self.suggested_coupons()?))
    }

    /// E.g. "Estimated delivery: 50 minutes (by 2:50 PM)".
    pub fn estimated_delivery_text(&self) -> String {
        PricingRules::new(&self.config).estimated_delivery_text(
            &self.cart,
            self.cart.express_delivery,
            self.clock.now(),
        )
    }

    fn recommender<'a>(&'a self, customer: &'a CustomerContext) -> CouponRecommender<'a> {
        let evaluator = EligibilityEvaluator::new(&self.config, customer, self.clock.today());
        CouponRecommender::new(
            &self.catalog,
            evaluator,
            &self.config,
            self.cart.applied_coupon.as_deref(),
        )
    }

    fn applied_coupon_discount(
        &self,
        subtotal: Money,
    ) -> Result<(Option<AppliedCouponStatus>, Money), CommerceError> {
        let zero = Money::zero(subtotal.currency);
        let Some(code) = self.cart.applied_coupon.as_deref() else {
            return Ok((None, zero));
        };
        // A code dropped from the catalog since it was applied no longer applies.
        let Some(coupon) = self.catalog.find_by_code(code) else {
            let status = AppliedCouponStatus {
                code: code.to_string(),
                eligibility: Eligibility::NotApplicable,
            };
            return Ok((Some(status), zero));
        };

        let customer = self.customer_context();
        let evaluator = EligibilityEvaluator::new(&self.config, &customer, self.clock.today());
        let eligibility = evaluator.eligibility(coupon, &self.cart, subtotal);
        let discount = if eligibility == Eligibility::Applicable {
            discount_amount(coupon, subtotal, &self.cart)?
        } else {
            zero
        };

        let status = AppliedCouponStatus {
            code: coupon.code.clone(),
            eligibility,
        };
        Ok((Some(status), discount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::clock::FixedClock;
    use crate::history::InMemoryHistory;
    use crate::money::Currency;

    fn rs(amount: i64) -> Money {
        Money::from_major(amount, Currency::INR)
    }

    fn engine_with(history: Arc<InMemoryHistory>) -> CartEngine {
        CartEngine::new(
            SessionId::new("sess_test"),
            Arc::new(CouponCatalog::storefront_defaults(Currency::INR)),
            history,
            Arc::new(FixedClock::at(2026, 6, 1, 14, 0).unwrap()),
            PricingConfig::default(),
        )
    }

    fn engine() -> CartEngine {
        engine_with(Arc::new(InMemoryHistory::new()))
    }

    fn product(id: &str, category: Category, price: i64) -> Product {
        Product::new(id, id, category, rs(price))
    }

    #[test]
    fn test_apply_and_replace_coupon() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 300), 2).unwrap();

        let first = engine.apply_coupon(" fresh15 ").unwrap();
        assert_eq!(first.code, "FRESH15");
        assert_eq!(first.discount, rs(75));
        assert_eq!(first.replaced, None);

        let second = engine.apply_coupon("SAVE20").unwrap();
        assert_eq!(second.discount, rs(100));
        assert_eq!(second.replaced.as_deref(), Some("FRESH15"));
        assert_eq!(engine.cart().applied_coupon.as_deref(), Some("SAVE20"));
        assert_eq!(engine.summary().unwrap().coupon_discount, rs(100));
    }

    #[test]
    fn test_unknown_coupon_rejected() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();

        let err = engine.apply_coupon("BOGUS").unwrap_err();
        assert_eq!(err.to_string(), "Invalid coupon code");
        assert!(matches!(err.rejection(), Some(Rejection::UnknownCode(code)) if code == "BOGUS"));
        assert_eq!(engine.cart().applied_coupon, None);
    }

    #[test]
    fn test_rejection_keeps_previous_coupon() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();
        engine.apply_coupon("FRESH15").unwrap();

        assert!(engine.apply_coupon("DAIRY10").is_err());
        assert_eq!(engine.cart().applied_coupon.as_deref(), Some("FRESH15"));
    }

    #[test]
    fn test_remove_coupon() {
        let mut engine = engine();
        assert_eq!(engine.remove_coupon(), Err(CommerceError::NoCouponApplied));

        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();
        engine.apply_coupon("FRESH15").unwrap();
        assert_eq!(engine.remove_coupon().unwrap(), "FRESH15");
        assert!(engine.summary().unwrap().coupon.is_none());
    }

    #[test]
    fn test_applied_coupon_revalidated_in_summary() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();
        engine.apply_coupon("FRESH15").unwrap();

        engine.set_quantity(&ProductId::new("apple"), 0).unwrap();
        engine.add_item(product("milk", Category::Dairy, 300), 1).unwrap();

        let summary = engine.summary().unwrap();
        let status = summary.coupon.unwrap();
        assert_eq!(status.code, "FRESH15");
        assert_eq!(status.eligibility, Eligibility::NotApplicable);
        assert!(summary.coupon_discount.is_zero());
        assert_eq!(summary.total, rs(300 + 54 + 50));

        engine.add_item(product("apple", Category::Fruits, 100), 1).unwrap();
        assert_eq!(engine.summary().unwrap().coupon_discount, rs(15));
    }

    #[test]
    fn test_summary_reports_product_savings() {
        let mut engine = engine();
        engine
            .add_item(product("cheese", Category::Dairy, 200).with_discount(25.0), 2)
            .unwrap();

        let summary = engine.summary().unwrap();
        assert_eq!(summary.original_subtotal, rs(400));
        assert_eq!(summary.subtotal, rs(300));
        assert_eq!(summary.product_savings, rs(100));
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.lines[0].effective_unit_price, rs(150));
        assert_eq!(summary.estimated_delivery_minutes, 50);
    }

    #[test]
    fn test_mark_coupon_used_detaches_applied() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();
        engine.apply_coupon("FRESH15").unwrap();

        engine.mark_coupon_used("FRESH15").unwrap();
        assert_eq!(engine.cart().applied_coupon, None);

        let err = engine.apply_coupon("FRESH15").unwrap_err();
        assert_eq!(err.to_string(), "This coupon has already been used");
        assert!(engine.mark_coupon_used("fresh15").is_err());
    }

    #[test]
    fn test_complete_order() {
        let history = Arc::new(InMemoryHistory::new());
        let mut engine = engine_with(history.clone());
        engine.add_item(product("snack", Category::Snacks, 400), 1).unwrap();
        engine.apply_coupon("WELCOME50").unwrap();

        let receipt = engine.complete_order().unwrap();
        assert_eq!(receipt.coupon_used.as_deref(), Some("WELCOME50"));
        assert_eq!(receipt.summary.total, rs(400 + 72 + 50 - 50));
        assert!(engine.cart().is_empty());
        assert_eq!(engine.cart().applied_coupon, None);
        assert!(!history.is_first_order(engine.session()));

        // Second order: WELCOME50 is both used and first-order-only.
        engine.add_item(product("snack", Category::Snacks, 400), 1).unwrap();
        let err = engine.apply_coupon("WELCOME50").unwrap_err();
        assert_eq!(err.to_string(), "This coupon has already been used");
    }

    #[test]
    fn test_complete_order_rejects_empty_cart() {
        let mut engine = engine();
        assert!(matches!(engine.complete_order(), Err(CommerceError::InvalidInput(_))));
    }

    #[test]
    fn test_complete_order_skips_lapsed_coupon() {
        let history = Arc::new(InMemoryHistory::new());
        let mut engine = engine_with(history.clone());
        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();
        engine.apply_coupon("FRESH15").unwrap();
        engine.set_quantity(&ProductId::new("apple"), 0).unwrap();
        engine.add_item(product("milk", Category::Dairy, 300), 1).unwrap();

        let receipt = engine.complete_order().unwrap();
        assert_eq!(receipt.coupon_used, None);
        assert!(history.used_coupons(engine.session()).is_empty());
    }

    /// History that loses every consume race.
    struct LosingHistory;

    impl CustomerHistory for LosingHistory {
        fn used_coupons(&self, _: &SessionId) -> std::collections::HashSet<String> {
            Default::default()
        }

        fn is_first_order(&self, _: &SessionId) -> bool {
            true
        }

        fn consume_coupon(&self, _: &SessionId, _: &str) -> Result<(), CommerceError> {
            Err(Rejection::Ineligible(crate::coupon::Ineligibility::AlreadyUsed).into())
        }

        fn record_order(&self, _: &SessionId) {
            panic!("order recorded after a lost race");
        }
    }

    #[test]
    fn test_complete_order_race_leaves_cart() {
        let mut engine = CartEngine::new(
            SessionId::new("sess_race"),
            Arc::new(CouponCatalog::storefront_defaults(Currency::INR)),
            Arc::new(LosingHistory),
            Arc::new(FixedClock::at(2026, 6, 1, 14, 0).unwrap()),
            PricingConfig::default(),
        );
        engine.add_item(product("apple", Category::Fruits, 300), 1).unwrap();
        engine.apply_coupon("FRESH15").unwrap();

        let err = engine.complete_order().unwrap_err();
        assert_eq!(err.to_string(), "This coupon has already been used");
        assert_eq!(engine.cart().line_count(), 1);
        assert_eq!(engine.cart().applied_coupon.as_deref(), Some("FRESH15"));
    }

    #[test]
    fn test_delivery_text_uses_clock() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 10), 1).unwrap();
        assert_eq!(
            engine.estimated_delivery_text(),
            "Estimated delivery: 50 minutes (by 2:50 PM)"
        );

        engine.set_express_delivery(true);
        assert_eq!(
            engine.estimated_delivery_text(),
            "Express delivery: 35 minutes (by 2:35 PM)"
        );
    }

    #[test]
    fn test_with_cart_resumes_state() {
        let mut cart = Cart::new();
        cart.add(product("apple", Category::Fruits, 300), 1).unwrap();
        cart.applied_coupon = Some("FRESH15".to_string());
        cart.express_delivery = true;

        let engine = engine().with_cart(cart.clone()).unwrap();
        let summary = engine.summary().unwrap();
        assert_eq!(summary.coupon_discount, rs(45));
        assert_eq!(summary.delivery_charge, rs(100));
        assert_eq!(engine.into_cart(), cart);
    }

    #[test]
    fn test_with_cart_rejects_invalid_cart() {
        let mut cart = Cart::new();
        cart.add(product("a", Category::Fruits, 100), 1).unwrap();
        let mut dup = cart.lines[0].clone();
        dup.product.price = rs(-500);
        cart.lines.push(dup);

        let result = engine().with_cart(cart);
        assert!(matches!(result, Err(CommerceError::InvalidInput(_))));
    }

    #[test]
    fn test_clear_drops_applied_coupon() {
        let mut engine = engine();
        engine.add_item(product("apple", Category::Fruits, 300), 2).unwrap();
        engine.set_express_delivery(true);
        engine.apply_coupon("FRESH15").unwrap();

        engine.clear();
        assert!(engine.cart().is_empty());
        assert_eq!(engine.cart().applied_coupon, None);
        assert_eq!(engine.remove_coupon(), Err(CommerceError::NoCouponApplied));

        let summary = engine.summary().unwrap();
        assert!(summary.coupon.is_none());
        assert!(summary.coupon_discount.is_zero());
        assert!(summary.subtotal.is_zero());
    }
}

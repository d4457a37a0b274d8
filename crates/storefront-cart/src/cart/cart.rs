//! Cart and cart line types.

use crate::catalog::{Category, Product};
use crate::error::CommerceError;
use crate::ids::ProductId;
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line.
pub const MAX_QUANTITY_PER_LINE: u32 = 9999;

/// A shopping cart.
///
/// Plain data, so callers can persist it wherever they keep session state
/// and resume it later with [`crate::CartEngine::with_cart`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Lines in insertion order, at most one per product.
    pub lines: Vec<CartLine>,
    /// Code of the applied coupon, at most one.
    #[serde(default)]
    pub applied_coupon: Option<String>,
    #[serde(default)]
    pub express_delivery: bool,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product, merging into its existing line.
    ///
    /// Returns the line's new quantity.
    pub fn add(&mut self, product: Product, quantity: u32) -> Result<u32, CommerceError> {
        if quantity == 0 {
            return Err(CommerceError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        product.validate()?;

        if let Some(existing) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            let new_quantity = existing
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_QUANTITY_PER_LINE)
                .ok_or_else(|| quantity_limit(existing.quantity as u64 + quantity as u64))?;
            existing.quantity = new_quantity;
            return Ok(new_quantity);
        }

        if quantity > MAX_QUANTITY_PER_LINE {
            return Err(quantity_limit(quantity as u64));
        }
        self.lines.push(CartLine { product, quantity });
        Ok(quantity)
    }

    /// Remove a product's line.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<CartLine, CommerceError> {
        let index = self
            .lines
            .iter()
            .position(|l| &l.product.id == product_id)
            .ok_or_else(|| CommerceError::ItemNotFound(product_id.clone()))?;
        Ok(self.lines.remove(index))
    }

    /// Set a line's quantity; zero or below removes the line.
    ///
    /// Returns `Ok(None)` when the line was removed.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<u32>, CommerceError> {
        if quantity <= 0 {
            self.remove(product_id)?;
            return Ok(None);
        }
        if quantity > MAX_QUANTITY_PER_LINE as i64 {
            return Err(quantity_limit(quantity as u64));
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| &l.product.id == product_id)
            .ok_or_else(|| CommerceError::ItemNotFound(product_id.clone()))?;
        line.quantity = quantity as u32;
        Ok(Some(line.quantity))
    }

    /// Check a cart that did not come through [`Cart::add`], such as one
    /// read back from storage.
    ///
    /// Every product must be valid, every quantity within
    /// 1..=[`MAX_QUANTITY_PER_LINE`], and no product may appear twice.
    pub fn validate(&self) -> Result<(), CommerceError> {
        for (index, line) in self.lines.iter().enumerate() {
            line.product.validate()?;
            if line.quantity == 0 {
                return Err(CommerceError::InvalidInput(format!(
                    "product {} has quantity 0",
                    line.product.id
                )));
            }
            if line.quantity > MAX_QUANTITY_PER_LINE {
                return Err(quantity_limit(line.quantity as u64));
            }
            if self.lines[..index].iter().any(|l| l.product.id == line.product.id) {
                return Err(CommerceError::InvalidInput(format!(
                    "product {} appears on more than one line",
                    line.product.id
                )));
            }
        }
        Ok(())
    }

    /// Remove every line and the applied coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.applied_coupon = None;
    }

    /// Sum of quantities across lines.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| l.quantity as u64).sum()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.get(product_id).is_some()
    }

    /// Quantity of a product in the cart, 0 if absent.
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.get(product_id).map_or(0, |l| l.quantity)
    }

    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product.id == product_id)
    }

    /// Lines whose product falls in one of `categories`.
    pub fn lines_in<'a>(
        &'a self,
        categories: &'a [Category],
    ) -> impl Iterator<Item = &'a CartLine> + 'a {
        self.lines
            .iter()
            .filter(move |l| categories.contains(&l.product.category))
    }

    pub fn has_category_in(&self, categories: &[Category]) -> bool {
        self.lines_in(categories).next().is_some()
    }
}

/// A product and how many of it the customer wants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub product: Product,
    /// Always at least 1.
    pub quantity: u32,
}

fn quantity_limit(requested: u64) -> CommerceError {
    CommerceError::InvalidInput(format!(
        "quantity {} exceeds maximum allowed ({})",
        requested, MAX_QUANTITY_PER_LINE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Currency, Money};

    fn product(id: &str, category: Category, rupees: i64) -> Product {
        Product::new(
            id,
            format!("Product {}", id),
            category,
            Money::from_major(rupees, Currency::INR),
        )
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 2).unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.line_count(), 1);
        assert!(cart.contains(&ProductId::new("1")));
    }

    #[test]
    fn test_add_same_item_increases_quantity() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 1).unwrap();
        let quantity = cart.add(product("1", Category::Fruits, 50), 2).unwrap();

        assert_eq!(quantity, 3);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.quantity_of(&ProductId::new("1")), 3);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = Cart::new();
        cart.add(product("b", Category::Dairy, 10), 1).unwrap();
        cart.add(product("a", Category::Snacks, 10), 1).unwrap();
        cart.add(product("b", Category::Dairy, 10), 1).unwrap();

        let ids: Vec<&str> = cart.lines.iter().map(|l| l.product.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_invalid_quantity() {
        let mut cart = Cart::new();
        let result = cart.add(product("1", Category::Fruits, 50), 0);
        assert!(matches!(result, Err(CommerceError::InvalidInput(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_invalid_product_rejected() {
        let mut cart = Cart::new();
        let bad = product("1", Category::Fruits, 50).with_discount(150.0);
        assert!(cart.add(bad, 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = Cart::new();
        assert!(cart.add(product("1", Category::Fruits, 1), MAX_QUANTITY_PER_LINE + 1).is_err());

        cart.add(product("1", Category::Fruits, 1), MAX_QUANTITY_PER_LINE).unwrap();
        assert!(cart.add(product("1", Category::Fruits, 1), 1).is_err());
        assert_eq!(cart.quantity_of(&ProductId::new("1")), MAX_QUANTITY_PER_LINE);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 1).unwrap();

        assert_eq!(cart.set_quantity(&ProductId::new("1"), 5).unwrap(), Some(5));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 3).unwrap();

        assert_eq!(cart.set_quantity(&ProductId::new("1"), 0).unwrap(), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_item() {
        let mut cart = Cart::new();
        let err = cart.set_quantity(&ProductId::new("404"), 2).unwrap_err();
        assert_eq!(err, CommerceError::ItemNotFound(ProductId::new("404")));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 1).unwrap();

        let line = cart.remove(&ProductId::new("1")).unwrap();
        assert_eq!(line.quantity, 1);
        assert!(cart.is_empty());
        assert!(cart.remove(&ProductId::new("1")).is_err());
    }

    #[test]
    fn test_clear_drops_coupon() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 1).unwrap();
        cart.applied_coupon = Some("SAVE20".to_string());

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.applied_coupon.is_none());
    }

    #[test]
    fn test_validate_accepts_built_cart() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 2).unwrap();
        cart.add(product("2", Category::Dairy, 60), MAX_QUANTITY_PER_LINE).unwrap();
        assert!(cart.validate().is_ok());
        assert!(Cart::new().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_stored_cart() {
        let line = |id: &str, rupees: i64, quantity: u32| CartLine {
            product: product(id, Category::Fruits, rupees),
            quantity,
        };
        let cart_of = |lines: Vec<CartLine>| Cart {
            lines,
            ..Cart::new()
        };

        let duplicate = cart_of(vec![line("a", 50, 1), line("a", 50, 2)]);
        assert!(matches!(duplicate.validate(), Err(CommerceError::InvalidInput(_))));

        let mut negative = line("a", 50, 1);
        negative.product.price = Money::from_major(-500, Currency::INR);
        assert!(cart_of(vec![negative]).validate().is_err());

        assert!(cart_of(vec![line("a", 50, 0)]).validate().is_err());
        assert!(cart_of(vec![line("a", 50, MAX_QUANTITY_PER_LINE + 1)]).validate().is_err());
    }

    #[test]
    fn test_lines_in_categories() {
        let mut cart = Cart::new();
        cart.add(product("1", Category::Fruits, 50), 1).unwrap();
        cart.add(product("2", Category::Dairy, 60), 1).unwrap();

        assert_eq!(cart.lines_in(&[Category::Fruits, Category::Vegetables]).count(), 1);
        assert!(!cart.has_category_in(&[Category::Snacks]));
    }
}

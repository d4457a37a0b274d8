//! Product and category types.
//!
//! Products come from the storefront catalog and are read-only here; the
//! engine only needs their price, discount and category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;

/// Product category. The storefront sells from a fixed set.
///
/// Names are matched case-insensitively, both when parsed and when read
/// from cart or coupon files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Category {
    Fruits,
    Vegetables,
    Dairy,
    Snacks,
    Beverages,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Fruits,
        Category::Vegetables,
        Category::Dairy,
        Category::Snacks,
        Category::Beverages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fruits => "Fruits",
            Category::Vegetables => "Vegetables",
            Category::Dairy => "Dairy",
            Category::Snacks => "Snacks",
            Category::Beverages => "Beverages",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CommerceError::InvalidInput(format!("unknown category: {}", s)))
    }
}

impl TryFrom<String> for Category {
    type Error = CommerceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A product as listed in the storefront catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    /// List price per unit.
    pub price: Money,
    /// Percentage off the list price, 0 for none.
    #[serde(default)]
    pub discount_percent: f64,
    /// Units available.
    #[serde(default)]
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: u32,
}

impl Product {
    /// Create an undiscounted product with unlimited-looking stock.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        category: Category,
        price: Money,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            price,
            discount_percent: 0.0,
            stock: u32::MAX,
            rating: None,
            review_count: 0,
        }
    }

    /// Set the product-level discount.
    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = percent;
        self
    }

    pub fn is_discounted(&self) -> bool {
        self.discount_percent > 0.0
    }

    /// Reject data the pricing rules are not defined for.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.name.trim().is_empty() {
            return Err(CommerceError::InvalidInput(format!(
                "product {} has no name",
                self.id
            )));
        }
        if !self.price.is_positive() {
            return Err(CommerceError::InvalidInput(format!(
                "product {} has non-positive price {}",
                self.id, self.price
            )));
        }
        if !(0.0..=100.0).contains(&self.discount_percent) {
            return Err(CommerceError::InvalidInput(format!(
                "product {} has discount {}% outside 0-100",
                self.id, self.discount_percent
            )));
        }
        Ok(())
    }
}

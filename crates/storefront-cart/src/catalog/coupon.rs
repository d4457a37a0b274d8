//! Coupon definitions and the coupon catalog.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::config::{is_json, read_config_file};
use crate::error::{CommerceError, ConfigError};
use crate::money::{Currency, Money};

/// What a coupon takes off the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CouponKind {
    /// A flat amount off the order.
    Fixed { amount: Money },
    /// A percentage of the whole cart.
    Percentage { percent: f64 },
    /// A percentage of the lines in the listed categories only.
    Category {
        percent: f64,
        categories: Vec<Category>,
    },
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Fixed { .. } => "fixed",
            CouponKind::Percentage { .. } => "percentage",
            CouponKind::Category { .. } => "category",
        }
    }
}

/// A promotional coupon. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    /// Upper-case code, unique within a catalog.
    pub code: String,
    pub description: String,
    pub kind: CouponKind,
    /// Cart total (after product discounts) required to qualify.
    pub min_order_value: Money,
    /// Upper bound on the discount, if any.
    pub max_discount: Option<Money>,
    pub active: bool,
    /// Last day the coupon can be used. `None` never expires.
    pub expiry_date: Option<NaiveDate>,
    /// Only customers without a completed order may use it.
    pub first_order_only: bool,
}

impl Coupon {
    /// Create an active, never-expiring coupon with no minimum.
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        kind: CouponKind,
        currency: Currency,
    ) -> Self {
        Self {
            code: normalize_code(&code.into()),
            description: description.into(),
            kind,
            min_order_value: Money::zero(currency),
            max_discount: None,
            active: true,
            expiry_date: None,
            first_order_only: false,
        }
    }

    pub fn with_min_order(mut self, min_order_value: Money) -> Self {
        self.min_order_value = min_order_value;
        self
    }

    pub fn with_max_discount(mut self, max_discount: Money) -> Self {
        self.max_discount = Some(max_discount);
        self
    }

    pub fn expires_on(mut self, date: NaiveDate) -> Self {
        self.expiry_date = Some(date);
        self
    }

    pub fn first_order_only(mut self) -> Self {
        self.first_order_only = true;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A coupon is usable through the whole of its expiry date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map_or(false, |expiry| today > expiry)
    }

    /// Whole calendar days left before expiry, never negative.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date
            .map(|expiry| (expiry - today).num_days().max(0))
    }

    /// Categories a category coupon is restricted to; empty for other kinds.
    pub fn applicable_categories(&self) -> &[Category] {
        match &self.kind {
            CouponKind::Category { categories, .. } => categories,
            _ => &[],
        }
    }

    /// Build a coupon from its config-file record.
    pub fn from_record(record: CouponRecord, currency: Currency) -> Result<Self, CommerceError> {
        let code = normalize_code(&record.code);
        if code.is_empty() {
            return Err(CommerceError::InvalidInput("coupon code is empty".to_string()));
        }
        if !record.value.is_finite() || record.value <= 0.0 {
            return Err(CommerceError::InvalidInput(format!(
                "coupon {} has non-positive value {}",
                code, record.value
            )));
        }

        let percent_in_range = record.value <= 100.0;
        let kind = match record.discount_type.trim().to_lowercase().as_str() {
            "fixed" => CouponKind::Fixed {
                amount: Money::from_decimal(record.value, currency),
            },
            "percentage" if percent_in_range => CouponKind::Percentage {
                percent: record.value,
            },
            "category" if percent_in_range => {
                if record.applicable_categories.is_empty() {
                    return Err(CommerceError::InvalidInput(format!(
                        "category coupon {} lists no categories",
                        code
                    )));
                }
                CouponKind::Category {
                    percent: record.value,
                    categories: record.applicable_categories,
                }
            }
            "percentage" | "category" => {
                return Err(CommerceError::InvalidInput(format!(
                    "coupon {} percentage {} exceeds 100",
                    code, record.value
                )))
            }
            other => {
                return Err(CommerceError::InvalidInput(format!(
                    "coupon {} has unknown type '{}'",
                    code, other
                )))
            }
        };

        let min_order_value = Money::from_decimal(record.min_order_value.max(0.0), currency);
        let max_discount = match record.max_discount {
            Some(cap) if cap < 0.0 || !cap.is_finite() => {
                return Err(CommerceError::InvalidInput(format!(
                    "coupon {} has invalid max discount {}",
                    code, cap
                )))
            }
            Some(cap) => Some(Money::from_decimal(cap, currency)),
            None => None,
        };

        Ok(Self {
            code,
            description: record.description,
            kind,
            min_order_value,
            max_discount,
            active: record.active,
            expiry_date: record.expiry_date,
            first_order_only: record.first_order_only,
        })
    }
}

/// Flat coupon record as written in catalog files, amounts in major units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRecord {
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// "percentage", "fixed" or "category".
    #[serde(rename = "type")]
    pub discount_type: String,
    pub value: f64,
    #[serde(default)]
    pub min_order_value: f64,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default, alias = "categories", alias = "category")]
    pub applicable_categories: Vec<Category>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub first_order_only: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    coupons: Vec<CouponRecord>,
}

/// Upper-cases and trims a customer-entered code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// The set of coupons on offer. Read-only and safe to share between carts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CouponCatalog {
    coupons: Vec<Coupon>,
}

impl CouponCatalog {
    /// Build a catalog, rejecting duplicate codes.
    pub fn new(coupons: Vec<Coupon>) -> Result<Self, CommerceError> {
        for (i, coupon) in coupons.iter().enumerate() {
            if coupons[..i].iter().any(|c| c.code == coupon.code) {
                return Err(CommerceError::InvalidInput(format!(
                    "duplicate coupon code {}",
                    coupon.code
                )));
            }
        }
        Ok(Self { coupons })
    }

    pub fn from_records(
        records: Vec<CouponRecord>,
        currency: Currency,
    ) -> Result<Self, CommerceError> {
        let coupons = records
            .into_iter()
            .map(|r| Coupon::from_record(r, currency))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(coupons)
    }

    /// Load a `[[coupons]]` TOML file, or `{"coupons": [...]}` JSON.
    pub fn load(path: impl AsRef<Path>, currency: Currency) -> Result<Self, ConfigError> {
        let content = read_config_file(path.as_ref())?;
        let file: CatalogFile = if is_json(path.as_ref()) {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        Ok(Self::from_records(file.coupons, currency)?)
    }

    /// The storefront's standing offers.
    pub fn storefront_defaults(currency: Currency) -> Self {
        let rs = |amount: i64| Money::from_major(amount, currency);
        let expiry = NaiveDate::from_ymd_opt(2027, 12, 31);
        let with_expiry = |coupon: Coupon| match expiry {
            Some(date) => coupon.expires_on(date),
            None => coupon,
        };

        let coupons = vec![
            Coupon::new(
                "SAVE20",
                "20% off orders above \u{20b9}500",
                CouponKind::Percentage { percent: 20.0 },
                currency,
            )
            .with_min_order(rs(500))
            .with_max_discount(rs(100)),
            Coupon::new(
                "FRESH15",
                "15% off on fruits & vegetables",
                CouponKind::Category {
                    percent: 15.0,
                    categories: vec![Category::Fruits, Category::Vegetables],
                },
                currency,
            )
            .with_min_order(rs(200))
            .with_max_discount(rs(75)),
            Coupon::new(
                "WELCOME50",
                "\u{20b9}50 off first order",
                CouponKind::Fixed { amount: rs(50) },
                currency,
            )
            .with_min_order(rs(300))
            .with_max_discount(rs(50))
            .first_order_only(),
            Coupon::new(
                "DAIRY10",
                "10% off on dairy products",
                CouponKind::Category {
                    percent: 10.0,
                    categories: vec![Category::Dairy],
                },
                currency,
            )
            .with_min_order(rs(150))
            .with_max_discount(rs(50)),
            Coupon::new(
                "SNACKS25",
                "\u{20b9}25 off snacks orders",
                CouponKind::Fixed { amount: rs(25) },
                currency,
            )
            .with_min_order(rs(100))
            .with_max_discount(rs(25)),
        ];

        Self {
            coupons: coupons.into_iter().map(with_expiry).collect(),
        }
    }

    /// Case-insensitive exact lookup.
    pub fn find_by_code(&self, code: &str) -> Option<&Coupon> {
        let code = normalize_code(code);
        self.coupons.iter().find(|c| c.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coupon> {
        self.coupons.iter()
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

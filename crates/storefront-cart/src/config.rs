//! Pricing configuration.
//!
//! Every constant the engine needs from its deployment lives here. Amounts
//! are written in major units (rupees) so config files stay readable:
//!
//! ```toml
//! tax_rate = 0.18
//! standard_delivery_charge = 50
//! express_delivery_charge = 100
//! free_delivery_threshold = 500
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::money::{Currency, Money};

/// Deployment-specific pricing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency every price and charge is expressed in.
    pub currency: Currency,

    /// Tax applied to the subtotal (0.18 = 18%).
    pub tax_rate: f64,

    /// Delivery charge below the free threshold.
    pub standard_delivery_charge: f64,

    /// Express delivery charge below the free threshold.
    pub express_delivery_charge: f64,

    /// Subtotal at or above which delivery is free.
    pub free_delivery_threshold: f64,

    /// Shortfall below a coupon's minimum that still counts as "almost".
    pub near_miss_window: f64,

    pub standard_delivery_minutes: u32,
    pub express_delivery_minutes: u32,

    /// Every started block of this many items adds `minutes_per_delivery_slot`.
    pub items_per_delivery_slot: u32,
    pub minutes_per_delivery_slot: u32,

    /// Coupons expiring within this many days get an urgency boost.
    pub expiry_urgency_days: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::INR,
            tax_rate: 0.18,
            standard_delivery_charge: 50.0,
            express_delivery_charge: 100.0,
            free_delivery_threshold: 500.0,
            near_miss_window: 100.0,
            standard_delivery_minutes: 45,
            express_delivery_minutes: 30,
            items_per_delivery_slot: 500,
            minutes_per_delivery_slot: 5,
            expiry_urgency_days: 7,
        }
    }
}

impl PricingConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = read_config_file(path.as_ref())?;
        let config: PricingConfig = if is_json(path.as_ref()) {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the constants describe a sane deployment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(ConfigError::Invalid(format!(
                "tax_rate must be in [0, 1), got {}",
                self.tax_rate
            )));
        }
        let amounts = [
            ("standard_delivery_charge", self.standard_delivery_charge),
            ("express_delivery_charge", self.express_delivery_charge),
            ("free_delivery_threshold", self.free_delivery_threshold),
            ("near_miss_window", self.near_miss_window),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative amount, got {}",
                    name, value
                )));
            }
        }
        if self.items_per_delivery_slot == 0 {
            return Err(ConfigError::Invalid(
                "items_per_delivery_slot must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn standard_delivery(&self) -> Money {
        self.money(self.standard_delivery_charge)
    }

    pub fn express_delivery(&self) -> Money {
        self.money(self.express_delivery_charge)
    }

    pub fn free_delivery_threshold(&self) -> Money {
        self.money(self.free_delivery_threshold)
    }

    pub fn near_miss_window(&self) -> Money {
        self.money(self.near_miss_window)
    }

    /// Zero in the configured currency.
    pub fn zero(&self) -> Money {
        Money::zero(self.currency)
    }

    /// Convert a major-unit amount into configured-currency `Money`.
    pub fn money(&self, amount: f64) -> Money {
        Money::from_decimal(amount, self.currency)
    }
}

pub(crate) fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PricingConfig::default();
        assert_eq!(config.standard_delivery().amount_minor, 5000);
        assert_eq!(config.express_delivery().amount_minor, 10000);
        assert_eq!(config.free_delivery_threshold().amount_minor, 50000);
        assert_eq!(config.near_miss_window().amount_minor, 10000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PricingConfig = toml::from_str("tax_rate = 0.08\n").unwrap();
        assert_eq!(config.tax_rate, 0.08);
        assert_eq!(config.standard_delivery_minutes, 45);
        assert_eq!(config.currency, Currency::INR);
    }

    #[test]
    fn test_json_config() {
        let config: PricingConfig =
            serde_json::from_str(r#"{"express_delivery_charge": 80}"#).unwrap();
        assert_eq!(config.express_delivery().amount_minor, 8000);
    }

    #[test]
    fn test_invalid_tax_rate() {
        let config = PricingConfig {
            tax_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_negative_charge_rejected() {
        let config = PricingConfig {
            standard_delivery_charge: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "storefront-pricing-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "free_delivery_threshold = 750\n").unwrap();
        let config = PricingConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.free_delivery_threshold().amount_minor, 75000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PricingConfig::load("/nonexistent/pricing.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

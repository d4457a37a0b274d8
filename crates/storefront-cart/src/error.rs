//! Commerce error types.

use crate::coupon::Ineligibility;
use crate::ids::ProductId;
use thiserror::Error;

/// Errors that can occur in cart and coupon operations.
///
/// Every variant is an expected outcome of normal use (a mistyped coupon
/// code, a stale product id) and leaves the cart unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// Malformed input: non-positive quantity, bad product data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotFound(ProductId),

    /// Coupon could not be applied or consumed.
    #[error("{0}")]
    CouponRejected(#[from] Rejection),

    /// No coupon is applied to the cart.
    #[error("No coupon to remove")]
    NoCouponApplied,

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,
}

impl CommerceError {
    /// The rejection reason, when this is a coupon rejection.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CommerceError::CouponRejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// Why a coupon code was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The code matches no coupon in the catalog.
    #[error("Invalid coupon code")]
    UnknownCode(String),

    /// The coupon exists but this customer or cart does not qualify.
    #[error("{0}")]
    Ineligible(Ineligibility),
}

/// Errors raised while loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failed to parse JSON.
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed but semantically invalid.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<CommerceError> for ConfigError {
    fn from(e: CommerceError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

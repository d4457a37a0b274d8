//! CLI command implementations.

pub mod apply;
pub mod offers;
pub mod summary;

use clap::{ArgAction, Args};
use storefront_cart::catalog::Category;

/// Who the cart belongs to, for coupon rules that depend on history.
#[derive(Args, Clone)]
pub struct CustomerArgs {
    /// Session id the customer history is keyed by.
    #[arg(long, default_value = "sess_cli")]
    pub session: String,

    /// Whether this is the customer's first order.
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub first_order: bool,

    /// Coupon codes the customer has already used.
    #[arg(long = "used", value_name = "CODE")]
    pub used: Vec<String>,
}

/// Arguments for the summary command.
#[derive(Args)]
pub struct SummaryArgs {
    /// Cart JSON file.
    pub cart: String,

    /// Price with express delivery.
    #[arg(long)]
    pub express: bool,

    #[command(flatten)]
    pub customer: CustomerArgs,
}

/// Arguments for the offers command.
#[derive(Args)]
pub struct OffersArgs {
    /// Cart JSON file.
    pub cart: String,

    /// Only show offers usable on this category.
    #[arg(long)]
    pub category: Option<Category>,

    #[command(flatten)]
    pub customer: CustomerArgs,
}

/// Arguments for the apply command.
#[derive(Args)]
pub struct ApplyArgs {
    /// Cart JSON file.
    pub cart: String,

    /// Coupon code (case-insensitive).
    pub code: String,

    /// Save the cart with the coupon applied.
    #[arg(short, long)]
    pub write: bool,

    #[command(flatten)]
    pub customer: CustomerArgs,
}

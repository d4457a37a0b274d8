//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use storefront_cart::catalog::{normalize_code, CouponCatalog};
use storefront_cart::cart::Cart;
use storefront_cart::clock::SystemClock;
use storefront_cart::config::PricingConfig;
use storefront_cart::history::{CustomerRecord, InMemoryHistory};
use storefront_cart::{CartEngine, SessionId};

use crate::commands::CustomerArgs;
use crate::output::Output;

const CONFIG_NAMES: [&str; 3] = ["pricing.toml", ".pricing.toml", "pricing.json"];

/// Execution context for CLI commands.
pub struct Context {
    pub pricing: PricingConfig,
    pub catalog: Arc<CouponCatalog>,
    pub output: Output,
}

impl Context {
    /// Load pricing config and coupon catalog.
    ///
    /// Without `--config`, the nearest `pricing.toml` up the directory tree
    /// is used, falling back to defaults.
    pub fn load(
        config_path: Option<&str>,
        coupons_path: Option<&str>,
        output: Output,
    ) -> Result<Self> {
        let pricing = match config_path {
            Some(path) => load_pricing(Path::new(path))?,
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                match find_config(&cwd) {
                    Some(path) => {
                        output.debug(&format!("Using pricing config {}", path.display()));
                        load_pricing(&path)?
                    }
                    None => PricingConfig::default(),
                }
            }
        };

        let catalog = match coupons_path {
            Some(path) => CouponCatalog::load(path, pricing.currency)
                .with_context(|| format!("Failed to load coupon catalog: {}", path))?,
            None => CouponCatalog::storefront_defaults(pricing.currency),
        };
        output.debug(&format!("{} coupons in catalog", catalog.len()));

        Ok(Self {
            pricing,
            catalog: Arc::new(catalog),
            output,
        })
    }

    pub fn read_cart(&self, path: &str) -> Result<Cart> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cart file: {}", path))?;
        let cart: Cart = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cart file: {}", path))?;
        cart.validate().with_context(|| format!("Invalid cart file: {}", path))?;
        tracing::debug!(path, lines = cart.line_count(), "cart loaded");
        Ok(cart)
    }

    pub fn write_cart(&self, path: &str, cart: &Cart) -> Result<()> {
        let content = serde_json::to_string_pretty(cart)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write cart file: {}", path))
    }

    /// An engine over `cart` for the customer described on the command line.
    pub fn engine(&self, cart: Cart, customer: &CustomerArgs) -> Result<CartEngine> {
        let session = SessionId::new(customer.session.as_str());
        let record = CustomerRecord {
            used_coupons: customer.used.iter().map(|code| normalize_code(code)).collect(),
            completed_orders: if customer.first_order { 0 } else { 1 },
            version: 0,
        };
        let history = InMemoryHistory::new().with_record(session.clone(), record);

        let engine = CartEngine::new(
            session,
            self.catalog.clone(),
            Arc::new(history),
            Arc::new(SystemClock),
            self.pricing.clone(),
        )
        .with_cart(cart)?;
        Ok(engine)
    }
}

fn load_pricing(path: &Path) -> Result<PricingConfig> {
    PricingConfig::load(path)
        .with_context(|| format!("Failed to load pricing config: {}", path.display()))
}

/// Find a pricing config in the directory tree.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

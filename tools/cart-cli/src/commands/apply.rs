//! Apply coupon command.

use anyhow::{Context as _, Result};
use serde::Serialize;
use storefront_cart::cart::OrderSummary;
use storefront_cart::CouponApplication;

use super::ApplyArgs;
use crate::context::Context;

#[derive(Serialize)]
struct ApplyReport {
    applied: CouponApplication,
    summary: OrderSummary,
}

/// Run the apply command.
pub fn run(args: ApplyArgs, ctx: &Context) -> Result<()> {
    let cart = ctx.read_cart(&args.cart)?;
    let mut engine = ctx.engine(cart, &args.customer)?;

    let applied = engine
        .apply_coupon(&args.code)
        .with_context(|| format!("Could not apply {}", args.code.trim()))?;
    let summary = engine.summary()?;

    if args.write {
        ctx.write_cart(&args.cart, engine.cart())?;
    }

    if ctx.output.is_json() {
        ctx.output.json(&ApplyReport { applied, summary });
        return Ok(());
    }

    if let Some(previous) = &applied.replaced {
        ctx.output.warn(&format!("{} replaces {}", applied.code, previous));
    }
    ctx.output.success(&format!(
        "Applied {}: you save {}",
        applied.code,
        applied.discount.display()
    ));
    ctx.output.summary(&summary);
    if args.write {
        ctx.output.info(&format!("Saved {}", args.cart));
    }
    Ok(())
}

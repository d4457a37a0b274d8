//! Coupon offers command.

use anyhow::Result;
use serde::Serialize;
use storefront_cart::coupon::{filter_by_category, CouponSuggestion, OfferStats, Recommendation};

use super::OffersArgs;
use crate::context::Context;

#[derive(Serialize)]
struct OffersReport<'a> {
    suggestions: Vec<&'a CouponSuggestion>,
    recommendation: &'a Recommendation,
    stats: &'a OfferStats,
}

/// Run the offers command.
pub fn run(args: OffersArgs, ctx: &Context) -> Result<()> {
    let cart = ctx.read_cart(&args.cart)?;
    let engine = ctx.engine(cart, &args.customer)?;

    let all = engine.suggested_coupons()?;
    let suggestions = match args.category {
        Some(category) => filter_by_category(&all, category),
        None => all.iter().collect(),
    };
    let recommendation = engine.smart_recommendation()?;
    let stats = engine.offer_stats()?;

    if ctx.output.is_json() {
        ctx.output.json(&OffersReport {
            suggestions,
            recommendation: &recommendation,
            stats: &stats,
        });
        return Ok(());
    }

    ctx.output.header("Offers");
    ctx.output.kv("Subtotal", &engine.subtotal()?.display());
    ctx.output.kv(
        "Ready to use",
        &format!("{} of {}", stats.ready_to_use, stats.total),
    );
    ctx.output.kv("Max savings", &stats.max_savings.display());

    if suggestions.is_empty() {
        ctx.output.info("No offers match that category.");
    } else {
        println!();
        ctx.output.table_row(
            &["CODE", "STATUS", "SAVE", "SCORE", "EXPIRY", ""],
            &[10, 16, 10, 5, 6, 8],
        );
        for suggestion in &suggestions {
            ctx.output.suggestion_row(suggestion);
        }
    }

    ctx.output.header("Recommended");
    match &recommendation.top {
        Some(_) => ctx.output.success(&recommendation.explanation),
        None => ctx.output.info(&recommendation.explanation),
    }
    for alternative in &recommendation.alternatives {
        ctx.output.list_item(&format!(
            "{} ({}): {}",
            alternative.code,
            alternative.potential_discount.display_compact(),
            alternative.description
        ));
    }

    Ok(())
}

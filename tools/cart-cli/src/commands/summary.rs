//! Cart summary command.

use anyhow::Result;

use super::SummaryArgs;
use crate::context::Context;

/// Run the summary command.
pub fn run(args: SummaryArgs, ctx: &Context) -> Result<()> {
    let cart = ctx.read_cart(&args.cart)?;
    let mut engine = ctx.engine(cart, &args.customer)?;
    if args.express {
        engine.set_express_delivery(true);
    }

    let summary = engine.summary()?;
    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    ctx.output.summary(&summary);
    ctx.output.info(&engine.estimated_delivery_text());
    Ok(())
}

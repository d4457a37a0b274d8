//! Cart CLI - price saved carts and try coupons against them.
//!
//! Commands:
//! - `cart summary` - Price a cart
//! - `cart offers` - List coupon suggestions and the best pick
//! - `cart apply` - Apply a coupon code

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ApplyArgs, OffersArgs, SummaryArgs};

/// Cart CLI - Price storefront carts and check coupons
#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Pricing config file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Coupon catalog file (TOML or JSON); built-in offers when omitted
    #[arg(long, global = true)]
    coupons: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the order summary for a cart
    Summary(SummaryArgs),

    /// List coupon suggestions and the recommended offer
    Offers(OffersArgs),

    /// Apply a coupon code to a cart
    Apply(ApplyArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);
    let loaded = context::Context::load(
        cli.config.as_deref(),
        cli.coupons.as_deref(),
        output.clone(),
    );
    let ctx = match loaded {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Summary(args) => commands::summary::run(args, &ctx),
        Commands::Offers(args) => commands::offers::run(args, &ctx),
        Commands::Apply(args) => commands::apply::run(args, &ctx),
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Engine events go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

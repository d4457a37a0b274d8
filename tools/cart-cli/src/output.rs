//! Output formatting for the CLI.

use console::style;
use storefront_cart::coupon::{CouponSuggestion, Eligibility};
use storefront_cart::cart::OrderSummary;
use storefront_cart::Money;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message; a JSON object on stderr in JSON mode.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  "));
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Render an order summary as a receipt-style block.
    pub fn summary(&self, summary: &OrderSummary) {
        if self.json {
            return;
        }

        self.header("Items");
        for line in &summary.lines {
            let price = if line.effective_unit_price != line.unit_price {
                format!(
                    "{} {}",
                    style(line.unit_price.display()).dim().strikethrough(),
                    line.effective_unit_price.display()
                )
            } else {
                line.unit_price.display()
            };
            println!(
                "  {:>4} x {:24} {:>18}  {}",
                line.quantity,
                line.name,
                price,
                style(line.line_total.display()).bold()
            );
        }
        if summary.lines.is_empty() {
            self.info("Cart is empty.");
        }

        self.header("Summary");
        if summary.product_savings.is_positive() {
            self.kv("List price", &summary.original_subtotal.display());
            self.kv("Product savings", &negative(summary.product_savings));
        }
        self.kv("Subtotal", &summary.subtotal.display());
        self.kv("Tax", &summary.tax.display());

        let delivery = if summary.is_free_delivery() {
            style("FREE").green().to_string()
        } else {
            summary.delivery_charge.display()
        };
        let mode = if summary.express_delivery { "express" } else { "standard" };
        self.kv(&format!("Delivery ({})", mode), &delivery);

        if let Some(coupon) = &summary.coupon {
            let label = format!("Coupon {}", coupon.code);
            if coupon.eligibility == Eligibility::Applicable {
                self.kv(&label, &negative(summary.coupon_discount));
            } else {
                self.kv(&label, &eligibility_badge(coupon.eligibility));
            }
        }

        self.kv("Total", &style(summary.total.display()).bold().to_string());
        if let Ok(savings) = summary.savings() {
            if savings.is_positive() {
                self.success(&format!("You save {}", savings.display()));
            }
        }
    }

    /// One suggestion as a table row.
    pub fn suggestion_row(&self, suggestion: &CouponSuggestion) {
        let mut flags = Vec::new();
        if suggestion.is_applied {
            flags.push("applied");
        }
        if suggestion.is_used {
            flags.push("used");
        }
        let expiry = suggestion
            .days_until_expiry
            .map(|days| format!("{}d", days))
            .unwrap_or_else(|| "-".to_string());

        self.table_row(
            &[
                &suggestion.code,
                &eligibility_badge(suggestion.eligibility),
                &suggestion.potential_discount.display_compact(),
                &format!("{:.0}", suggestion.relevance_score),
                &expiry,
                &flags.join(","),
            ],
            &[10, 16, 10, 5, 6, 8],
        );
        if suggestion.eligibility != Eligibility::Applicable {
            self.debug(&format!("{}: {}", suggestion.code, suggestion.eligibility_reason));
        }
    }
}

/// Coloured eligibility tier.
pub fn eligibility_badge(eligibility: Eligibility) -> String {
    let label = eligibility.as_str();
    match eligibility {
        Eligibility::Applicable => style(label).green().to_string(),
        Eligibility::Almost => style(label).yellow().to_string(),
        Eligibility::NotApplicable => style(label).dim().to_string(),
    }
}

fn negative(amount: Money) -> String {
    style(format!("-{}", amount.display())).green().to_string()
}

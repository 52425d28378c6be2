//! Command implementations, one module per subcommand group.

pub mod cart;
pub mod catalog;
pub mod export;
pub mod orders;

use anyhow::Result;
use kassa_checkout::ShopConfig;
use kassa_core::{OrderPricingResult, TaxBreakdownBucket};

pub fn print_config(config: &ShopConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn bucket_line(label: &str, bucket: &TaxBreakdownBucket) {
    println!(
        "  {:<28} {:>12} {:>12} {:>12}",
        label,
        bucket.ex_tax().to_string(),
        bucket.tax().to_string(),
        bucket.inc_tax().to_string()
    );
}

/// Prints the breakdown a customer sees under the cart.
pub(crate) fn print_pricing(pricing: &OrderPricingResult) {
    println!(
        "  {:<28} {:>12} {:>12} {:>12}",
        "", "exkl. moms", "moms", "inkl. moms"
    );
    for rate in pricing.rates.iter().filter(|r| !r.bucket.inc_tax().is_zero()) {
        bucket_line(&format!("Varor {}", rate.rate), &rate.bucket);
    }
    if pricing.products.discount.is_positive() {
        println!(
            "  {:<28} {:>38}",
            format!("Rabatt {}%", pricing.discount_percent),
            format!("-{}", pricing.products.discount)
        );
    }
    bucket_line("Varor efter rabatt", &pricing.products.bucket);
    bucket_line(&format!("Frakt {}", pricing.shipping.rate), &pricing.shipping.bucket);
    if !pricing.total.rounding_adjustment.is_zero() {
        println!(
            "  {:<28} {:>38}",
            "Öresavrundning",
            pricing.total.rounding_adjustment.to_string()
        );
    }
    println!(
        "  {:<28} {:>12} {:>12} {:>12}",
        "Att betala",
        pricing.total.ex_tax.to_string(),
        pricing.total.tax.to_string(),
        pricing.total.inc_tax.to_string()
    );
}

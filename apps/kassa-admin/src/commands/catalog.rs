//! `seed` and `products`.

use anyhow::Result;
use kassa_checkout::CatalogStore;
use kassa_db::seed::{seed_catalog, SeedOutcome};

use crate::Context;

pub async fn seed(ctx: &Context) -> Result<()> {
    match seed_catalog(&ctx.db).await? {
        SeedOutcome::Skipped { existing } => {
            println!("Database already has {} products, nothing seeded.", existing);
        }
        SeedOutcome::Inserted { count } => {
            println!("Seeded {} products.", count);
            list(ctx).await?;
        }
    }
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let products = ctx.db.products().list_in_stock_products().await?;
    if products.is_empty() {
        println!("No products in stock. Run `kassa-admin seed` for the demo catalog.");
        return Ok(());
    }

    let rates = &ctx.config.pricing.rates;
    let unit = ctx.config.pricing.rounding.unit;
    for product in products {
        let rate = rates.rate_for(product.tax_category);
        let price = product.effective_price();
        println!(
            "{}  {:<24} {:>12} {:>12}  {}{}",
            product.id,
            product.title,
            price.to_string(),
            price.to_gross(rate, unit).to_string(),
            rate,
            if product.discount_active { "  rea" } else { "" }
        );
    }
    Ok(())
}

//! `cart …`: the local cart file.

use anyhow::{bail, Result};
use kassa_checkout::{CartPricer, CartRepository, CatalogStore};
use kassa_core::{Cart, CheckoutRequest};
use tracing::info;

use super::print_pricing;
use crate::cli::{CartCommand, QuoteArgs};
use crate::Context;

pub async fn run(ctx: &Context, cmd: CartCommand) -> Result<()> {
    let mut cart = Cart::from_items(ctx.cart.load()?);

    match cmd {
        CartCommand::Add { product, quantity } => {
            let products = ctx.db.products().list_in_stock_products().await?;
            let Some(found) = products
                .iter()
                .find(|p| p.id == product || p.title.eq_ignore_ascii_case(&product))
            else {
                bail!("No product in stock matches '{}'", product);
            };
            cart.add_product(found, quantity)?;
            info!(product_id = %found.id, quantity, "Added to cart");
        }
        CartCommand::Set {
            product_id,
            quantity,
        } => cart.update_quantity(&product_id, quantity)?,
        CartCommand::Remove { product_id } => cart.remove_item(&product_id)?,
        CartCommand::Clear => cart.clear(),
        CartCommand::Show(args) => return show(ctx, &cart, &args),
        CartCommand::Payload {
            quote,
            email,
            newsletter,
        } => {
            let request = CheckoutRequest {
                email,
                user_id: None,
                discount_code: quote.code,
                newsletter_opt_in: newsletter,
            };
            let prepared =
                CartPricer::new(&ctx.config).prepare(cart.items(), &quote.shipping, &request)?;
            println!("{}", serde_json::to_string_pretty(&prepared.payload)?);
            return Ok(());
        }
    }

    ctx.cart.save(cart.items())?;
    println!(
        "{} lines, {} items in the cart.",
        cart.item_count(),
        cart.total_quantity()
    );
    Ok(())
}

fn show(ctx: &Context, cart: &Cart, args: &QuoteArgs) -> Result<()> {
    if cart.is_empty() {
        println!("The cart is empty.");
        return Ok(());
    }

    let pricer = CartPricer::new(&ctx.config);
    let config = pricer.pricing_config();
    for item in cart.items() {
        let rate = config.rates.rate_for(item.tax_category);
        let unit_gross = item.unit_price_ex_tax.to_gross(rate, config.rounding.unit);
        println!(
            "{:>4} × {:<24} {:>12}  ({})",
            item.quantity,
            item.title,
            unit_gross.to_string(),
            item.product_id
        );
    }
    println!();

    let quote = pricer.quote(cart.items(), &args.shipping, args.code.as_deref())?;
    println!("Frakt: {} ({})", quote.shipping.name, quote.shipping.region);
    print_pricing(&quote.pricing);
    Ok(())
}

//! `order …`: list orders and move them through their lifecycle.

use anyhow::Result;
use kassa_core::{Order, OrderStatus};

use super::print_pricing;
use crate::cli::OrderCommand;
use crate::Context;

pub async fn run(ctx: &Context, cmd: OrderCommand) -> Result<()> {
    let orders = ctx.db.orders();

    match cmd {
        OrderCommand::List { limit } => {
            let recent = orders.list_recent(limit).await?;
            if recent.is_empty() {
                println!("No orders yet.");
            }
            for order in &recent {
                print_summary(order);
            }
        }
        OrderCommand::Show { order_id } => {
            let order = orders.require(&order_id).await?;
            print_summary(&order);
            for item in &order.items {
                println!(
                    "  {:>4} × {:<24} {:>12}",
                    item.quantity,
                    item.title,
                    item.unit_price_inc_tax.to_string()
                );
            }
            if let Some(code) = &order.discount_code {
                println!("  Rabattkod: {}", code);
            }
            match &order.pricing {
                Some(pricing) => print_pricing(pricing),
                None => println!("  (no pricing snapshot)"),
            }
        }
        OrderCommand::Settle {
            order_id,
            transaction_id,
        } => {
            let order = orders.mark_completed(&order_id, &transaction_id).await?;
            print_summary(&order);
        }
        OrderCommand::Cancel { order_id } => {
            let order = orders.update_status(&order_id, OrderStatus::Canceled).await?;
            print_summary(&order);
        }
        OrderCommand::Fail { order_id } => {
            let order = orders.update_status(&order_id, OrderStatus::Failed).await?;
            print_summary(&order);
        }
    }

    Ok(())
}

fn print_summary(order: &Order) {
    println!(
        "{}  {}  {:<10} {:>12}  {}  {}",
        order.order_number(),
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.status.to_string(),
        order.total_amount.to_string(),
        order.email,
        order.transaction_id.as_deref().unwrap_or("-")
    );
}

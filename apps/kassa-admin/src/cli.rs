//! CLI argument definitions using clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kassa-admin")]
#[command(version)]
#[command(about = "Back office for the Kassa web shop", long_about = None)]
pub struct Cli {
    /// Config file (default: platform config dir/kassa.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Cart file, overriding the one next to the database
    #[arg(long, global = true)]
    pub cart: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Insert the demo catalog into an empty database
    Seed,

    /// List the products in stock
    Products,

    /// Edit and price the local cart
    #[command(subcommand)]
    Cart(CartCommand),

    /// Inspect and settle orders
    #[command(subcommand)]
    Order(OrderCommand),

    /// Write the bookkeeping CSV
    Export(ExportArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Add a product (by id or exact title)
    Add {
        product: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },

    /// Set a line's quantity; 0 removes it
    Set { product_id: String, quantity: i64 },

    /// Remove a line
    Remove { product_id: String },

    /// Empty the cart
    Clear,

    /// Show the cart with a price breakdown
    Show(QuoteArgs),

    /// Print the payment session request the cart would produce
    Payload {
        #[command(flatten)]
        quote: QuoteArgs,

        /// Customer e-mail
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        newsletter: bool,
    },
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Shipping option id
    #[arg(short, long, default_value = "sweden")]
    pub shipping: String,

    /// Discount code
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(Subcommand)]
pub enum OrderCommand {
    /// Most recent orders, any status
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Show one order with its pricing snapshot
    Show { order_id: String },

    /// Mark a pending order completed with the processor's transaction id
    Settle {
        order_id: String,
        transaction_id: String,
    },

    /// Cancel a pending order
    Cancel { order_id: String },

    /// Mark a pending order failed
    Fail { order_id: String },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// First order date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last order date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Output file or directory (default: current directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Fee export JSON, overriding `gateway.fees_file`
    #[arg(long)]
    pub fees: Option<PathBuf>,

    /// Skip fee lookups; every fee is reported pending
    #[arg(long, conflicts_with = "fees")]
    pub no_fees: bool,
}

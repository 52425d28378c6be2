//! # kassa-admin
//!
//! Back-office tool for the Kassa web shop.
//!
//! ```text
//! kassa-admin seed
//! kassa-admin products
//! kassa-admin cart add "Att bli till" --quantity 2
//! kassa-admin cart show --shipping europe --code välkommen10
//! kassa-admin order settle 3f2a9c1e-… pi_3Nk…
//! kassa-admin export --from 2024-01-01 --to 2024-03-31 --fees fees.json
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG`.

mod cli;
mod commands;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use kassa_checkout::{FileCartRepository, ShopConfig};
use kassa_db::{Database, DbConfig};

/// What every command gets: the loaded config and the opened stores.
pub struct Context {
    pub config: ShopConfig,
    pub db: Database,
    pub cart: FileCartRepository,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = ShopConfig::load(cli.config.clone()).context("loading shop config")?;
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }

    if let Commands::Config = cli.command {
        return commands::print_config(&config);
    }

    let ctx = open(config, cli.cart.clone()).await?;

    let result = match cli.command {
        Commands::Seed => commands::catalog::seed(&ctx).await,
        Commands::Products => commands::catalog::list(&ctx).await,
        Commands::Cart(cmd) => commands::cart::run(&ctx, cmd).await,
        Commands::Order(cmd) => commands::orders::run(&ctx, cmd).await,
        Commands::Export(args) => commands::export::run(&ctx, args).await,
        Commands::Config => Ok(()),
    };

    ctx.db.close().await;
    result
}

async fn open(config: ShopConfig, cart_path: Option<std::path::PathBuf>) -> Result<Context> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    debug!(path = %db_path.display(), "Opening database");

    let db = Database::new(
        DbConfig::new(&db_path).max_connections(config.database.max_connections),
    )
    .await
    .with_context(|| format!("opening database {}", db_path.display()))?;

    let cart = match cart_path {
        Some(path) => FileCartRepository::new(path),
        None => FileCartRepository::new(config.cart_path()?),
    };

    Ok(Context { config, db, cart })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kassa=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

//! `export`: the bookkeeping CSV.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::Utc;
use kassa_checkout::{AccountingService, StaticFeeTable};
use kassa_core::{booking_date, DateRange};
use tracing::info;

use crate::cli::ExportArgs;
use crate::Context;

pub async fn run(ctx: &Context, args: ExportArgs) -> Result<()> {
    let range = DateRange::new(args.from, args.to)?;
    let accounting = AccountingService::new(ctx.db.orders(), ctx.config.pricing);

    let fees_file = args.fees.or_else(|| ctx.config.gateway.fees_file.clone());
    let ledger = match fees_file.filter(|_| !args.no_fees) {
        Some(path) => {
            let table = StaticFeeTable::from_file(&path)?;
            info!(path = %path.display(), fees = table.len(), "Using fee table");
            accounting.ledger_with_fees(&range, &table).await?
        }
        None => accounting.ledger_without_fees(&range).await?,
    };

    let export = accounting.export_csv(&ledger, &range, booking_date(&Utc::now()))?;
    let target = match args.out {
        Some(path) if path.is_dir() => path.join(&export.file_name),
        Some(path) => path,
        None => PathBuf::from(&export.file_name),
    };
    std::fs::write(&target, &export.bytes)
        .with_context(|| format!("writing {}", target.display()))?;

    let totals = &ledger.totals;
    println!("Wrote {} orders to {}", ledger.rows.len(), target.display());
    println!("  Belopp inkl. moms: {}", totals.amount_inc_tax);
    println!("  Total moms:        {}", totals.total_tax);
    println!("  Avgifter:          {}", totals.processor_fee);
    println!("  Nettoutbetalning:  {}", totals.net_payout);
    if totals.fees_pending > 0 {
        println!("  {} fees still pending", totals.fees_pending);
    }
    Ok(())
}

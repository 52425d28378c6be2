//! # Accounting Service
//!
//! Builds the bookkeeping ledger from the order store, with or without the
//! processor's fees, and renders it as the CSV the bookkeeper imports.

use chrono::NaiveDate;
use tracing::info;

use crate::error::StoreResult;
use crate::fees::fetch_fees;
use crate::ports::{FeeLookup, OrderStore};
use kassa_core::{
    build_ledger, export_file_name, render_csv, CoreResult, DateRange, FeeMap, Ledger,
    PricingConfig,
};

/// A rendered bookkeeping export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct AccountingService<O> {
    orders: O,
    pricing: PricingConfig,
}

impl<O: OrderStore> AccountingService<O> {
    pub fn new(orders: O, pricing: PricingConfig) -> Self {
        AccountingService { orders, pricing }
    }

    /// Ledger with every fee pending. Makes no fee lookups.
    pub async fn ledger_without_fees(&self, range: &DateRange) -> StoreResult<Ledger> {
        let orders = self
            .orders
            .list_completed_orders_with_transaction_ids()
            .await?;
        Ok(self.build(&orders, &FeeMap::new(), range))
    }

    /// Ledger with the processor's fees looked up for the orders in range.
    pub async fn ledger_with_fees<F>(&self, range: &DateRange, lookup: &F) -> StoreResult<Ledger>
    where
        F: FeeLookup + ?Sized,
    {
        let orders = self
            .orders
            .list_completed_orders_with_transaction_ids()
            .await?;

        let ids: Vec<String> = orders
            .iter()
            .filter(|o| range.contains(&o.created_at))
            .filter_map(|o| o.transaction_id.clone())
            .collect();
        let fees = fetch_fees(lookup, &ids).await;

        Ok(self.build(&orders, &fees, range))
    }

    /// Renders `ledger` with the file name the bookkeeper expects.
    pub fn export_csv(
        &self,
        ledger: &Ledger,
        range: &DateRange,
        today: NaiveDate,
    ) -> CoreResult<CsvExport> {
        Ok(CsvExport {
            file_name: export_file_name(range, today),
            bytes: render_csv(ledger, &self.pricing.rates)?,
        })
    }

    fn build(&self, orders: &[kassa_core::Order], fees: &FeeMap, range: &DateRange) -> Ledger {
        let ledger = build_ledger(
            orders,
            fees,
            range,
            &self.pricing.rates,
            self.pricing.rounding.unit,
        );
        info!(
            orders = ledger.rows.len(),
            fees_pending = ledger.totals.fees_pending,
            total = %ledger.totals.amount_inc_tax,
            "Ledger built"
        );
        ledger
    }
}

//! # Demo Catalog
//!
//! A small catalog for development databases: a handful of books at the
//! reduced rate and some merchandise at the standard rate, one of them on
//! sale.
//!
//! Used by `kassa-admin seed`.

use tracing::{info, warn};

use crate::error::DbResult;
use crate::pool::Database;
use kassa_core::{Money, NewProduct, TaxCategory};

/// (title, ex. moms price in kronor, sale price, category)
const DEMO_PRODUCTS: &[(&str, i64, Option<i64>, TaxCategory)] = &[
    ("Att bli till", 94, None, TaxCategory::Book),
    ("Tystnadens hus", 189, None, TaxCategory::Book),
    ("Nattvandring", 142, Some(113), TaxCategory::Book),
    ("Tygkasse", 120, None, TaxCategory::Merchandise),
    ("Affisch A3", 80, None, TaxCategory::Merchandise),
    ("Bokmärke", 24, None, TaxCategory::Merchandise),
];

/// Builds the demo catalog in display order.
pub fn demo_catalog() -> Vec<NewProduct> {
    DEMO_PRODUCTS
        .iter()
        .enumerate()
        .map(|(idx, &(title, kronor, sale, category))| {
            let list = Money::from_kronor(kronor);
            let (price, original_price, discount_active) = match sale {
                Some(sale) => (Money::from_kronor(sale), Some(list), true),
                None => (list, None, false),
            };
            NewProduct {
                title: title.to_string(),
                description: None,
                price,
                original_price,
                tax_category: Some(category),
                discount_active,
                in_stock: true,
                sort_order: idx as i64,
            }
        })
        .collect()
}

/// What [`seed_catalog`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The catalog already had products; nothing was written.
    Skipped { existing: i64 },
    Inserted { count: usize },
}

/// Inserts the demo catalog into an empty database.
///
/// A non-empty catalog is left alone to avoid duplicates.
pub async fn seed_catalog(db: &Database) -> DbResult<SeedOutcome> {
    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Catalog already has products, skipping seed");
        return Ok(SeedOutcome::Skipped { existing });
    }

    let repo = db.products();
    let catalog = demo_catalog();
    for product in &catalog {
        repo.insert(product).await?;
    }

    info!(count = catalog.len(), "Seeded demo catalog");
    Ok(SeedOutcome::Inserted {
        count: catalog.len(),
    })
}

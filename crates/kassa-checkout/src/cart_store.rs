//! # Cart File
//!
//! Keeps the cart in a JSON file so it survives between invocations.
//!
//! Lines carry the price and category frozen when the product was added.
//! Carts saved before categories existed have `tax_category: null`; those
//! lines price at the reduced rate.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::project_dirs;
use crate::error::{CartStoreError, CartStoreResult};
use crate::ports::CartRepository;
use kassa_core::LineItem;

/// A [`CartRepository`] backed by one JSON file.
#[derive(Debug, Clone)]
pub struct FileCartRepository {
    path: PathBuf,
}

impl FileCartRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCartRepository { path: path.into() }
    }

    /// `cart.json` in the platform data directory.
    pub fn default_location() -> CartStoreResult<Self> {
        project_dirs()
            .map(|dirs| Self::new(dirs.data_dir().join("cart.json")))
            .ok_or(CartStoreError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CartStoreError {
        CartStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CartRepository for FileCartRepository {
    fn load(&self) -> CartStoreResult<Vec<LineItem>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved cart");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let items: Vec<LineItem> =
            serde_json::from_str(&json).map_err(|source| CartStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), lines = items.len(), "Loaded cart");
        Ok(items)
    }

    fn save(&self, items: &[LineItem]) -> CartStoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(items).map_err(|source| CartStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), lines = items.len(), "Saved cart");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_core::{Cart, Money, TaxCategory};

    fn line(id: &str, category: Option<TaxCategory>) -> LineItem {
        LineItem {
            product_id: id.to_string(),
            title: "Att bli till".to_string(),
            unit_price_ex_tax: Money::from_kronor(94),
            quantity: 2,
            tax_category: category,
        }
    }

    #[test]
    fn test_missing_file_is_empty_cart() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileCartRepository::new(dir.path().join("cart.json"));
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileCartRepository::new(dir.path().join("nested").join("cart.json"));
        let items = vec![line("a", Some(TaxCategory::Book)), line("b", None)];

        repo.save(&items).unwrap();
        assert_eq!(repo.load().unwrap(), items);

        let mut cart = Cart::from_items(repo.load().unwrap());
        cart.clear();
        repo.save(cart.items()).unwrap();
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileCartRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, CartStoreError::Corrupt { .. }));
    }
}

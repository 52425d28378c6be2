//! # Processor Fees
//!
//! Looks up the processor's fee for each settled transaction.
//!
//! Lookups run concurrently, one per transaction id. A failed lookup drops
//! that id from the map; its row is then booked with a zero fee marked
//! pending instead of failing the whole export.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::ports::FeeLookup;
use kassa_core::{FeeMap, Money};

/// Fetches fees for `transaction_ids`, skipping ids whose lookup fails.
pub async fn fetch_fees<F>(lookup: &F, transaction_ids: &[String]) -> FeeMap
where
    F: FeeLookup + ?Sized,
{
    let lookups = transaction_ids.iter().map(|id| async move {
        let result = lookup.transaction_fee(id).await;
        (id, result)
    });

    let mut fees = FeeMap::new();
    for (id, result) in join_all(lookups).await {
        match result {
            Ok(Some(fee)) => {
                fees.insert(id.clone(), fee);
            }
            Ok(None) => debug!(transaction_id = %id, "No fee recorded yet"),
            Err(e) => warn!(transaction_id = %id, error = %e, "Fee lookup failed"),
        }
    }

    info!(
        requested = transaction_ids.len(),
        found = fees.len(),
        "Fetched processor fees"
    );
    fees
}

// =============================================================================
// Static Fee Table
// =============================================================================

/// Fee export as written by the processor dashboard script, either wrapped
/// (`{"fees": {"pi_1": 420}}`) or flat (`{"pi_1": 420}`). Amounts in öre.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeeFile {
    Wrapped { fees: HashMap<String, Money> },
    Flat(HashMap<String, Money>),
}

/// A [`FeeLookup`] backed by a fee export held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFeeTable {
    fees: FeeMap,
}

impl StaticFeeTable {
    pub fn new(fees: FeeMap) -> Self {
        StaticFeeTable { fees }
    }

    pub fn from_json(json: &str) -> GatewayResult<Self> {
        let file: FeeFile = serde_json::from_str(json)
            .map_err(|e| GatewayError::Rejected(format!("fee file is not valid: {}", e)))?;
        let fees = match file {
            FeeFile::Wrapped { fees } | FeeFile::Flat(fees) => fees,
        };
        Ok(StaticFeeTable { fees })
    }

    pub fn from_file(path: &Path) -> GatewayResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::NotConfigured(format!("cannot read fee file {}: {}", path.display(), e))
        })?;
        let table = Self::from_json(&json)?;
        debug!(path = %path.display(), count = table.len(), "Loaded fee table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.fees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fees.is_empty()
    }
}

#[async_trait]
impl FeeLookup for StaticFeeTable {
    async fn transaction_fee(&self, transaction_id: &str) -> GatewayResult<Option<Money>> {
        Ok(self.fees.get(transaction_id).copied())
    }
}

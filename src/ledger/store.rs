//! Ledger persistence
//!
//! Limits must survive restarts; a crash that silently reset the daily
//! anchor would let a breached account trade again.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable part of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub initial_balance: Decimal,
    pub daily_start_balance: Decimal,
    pub last_reset_day: NaiveDate,
    pub peak_balance: Decimal,
    pub daily_realized_pnl: Decimal,
}

/// JSON-file store for [`LedgerState`].
///
/// Writes go to a temp file first and land with an atomic rename, so a
/// crash mid-save leaves the previous snapshot intact.
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted state, `None` when no snapshot exists yet
    pub fn load(&self) -> anyhow::Result<Option<LedgerState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state: LedgerState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Persist a snapshot
    pub fn save(&self, state: &LedgerState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

//! Brokerage account snapshot

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the brokerage account.
///
/// Snapshots are read-only inputs refreshed each evaluation cycle; the
/// engine never writes balance or equity back to the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Closed-trade balance
    pub balance: Decimal,
    /// Balance plus floating P&L
    pub equity: Decimal,
    /// Margin currently in use
    pub margin_used: Decimal,
    /// Account currency code
    pub currency: String,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Floating P&L implied by the snapshot
    pub fn floating_pnl(&self) -> Decimal {
        self.equity - self.balance
    }

    /// Margin still available for new positions
    pub fn free_margin(&self) -> Decimal {
        self.equity - self.margin_used
    }
}

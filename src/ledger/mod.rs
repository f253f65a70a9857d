//! Risk ledger module
//!
//! Account-level loss accounting: daily loss and total drawdown limits,
//! settlement-timezone day rollover, and the persisted state that keeps
//! limits honest across restarts.

mod risk;
mod store;

pub use risk::{DayRollover, HaltReason, LedgerError, RiskLedger};
pub use store::{LedgerState, LedgerStore};

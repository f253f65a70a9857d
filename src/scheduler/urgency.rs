//! Adaptive scan cadence

use crate::position::Position;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;

/// How urgently a symbol needs attention this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanUrgency {
    /// No open position: wait for a fresh bar
    Idle,
    /// Open position, nothing alarming
    Monitoring,
    /// A position is bleeding or sitting on protectable profit
    Urgent,
}

/// Thresholds that promote a symbol to urgent
#[derive(Debug, Clone)]
pub struct UrgencyThresholds {
    /// Single-position floating loss as a fraction of balance
    pub single_loss_pct: Decimal,
    /// Aggregate floating loss on the symbol as a fraction of balance
    pub aggregate_loss_pct: Decimal,
    /// Absolute floating profit worth protecting, in account currency
    pub protect_profit_abs: Decimal,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            single_loss_pct: dec!(0.003),
            aggregate_loss_pct: dec!(0.01),
            protect_profit_abs: dec!(500),
        }
    }
}

/// Classify one symbol's urgency from its open positions
pub fn classify(
    positions: &[&Position],
    balance: Decimal,
    thresholds: &UrgencyThresholds,
) -> ScanUrgency {
    if positions.is_empty() {
        return ScanUrgency::Idle;
    }

    let single_loss_floor = -balance * thresholds.single_loss_pct;
    let aggregate_loss_floor = -balance * thresholds.aggregate_loss_pct;
    let aggregate: Decimal = positions.iter().map(|p| p.floating_pnl).sum();

    let urgent = positions.iter().any(|p| {
        p.floating_pnl < single_loss_floor || p.floating_pnl > thresholds.protect_profit_abs
    }) || aggregate < aggregate_loss_floor;

    if urgent {
        ScanUrgency::Urgent
    } else {
        ScanUrgency::Monitoring
    }
}

#[derive(Debug, Default, Clone)]
struct SymbolScanState {
    last_scan: Option<DateTime<Utc>>,
    last_bar_index: Option<i64>,
}

/// Decides, per symbol per cycle, whether a consultation is due.
///
/// Urgent and monitoring tiers run on elapsed-time cadences; idle
/// symbols consult only when a new bar of the base timeframe opens.
/// A closed market suppresses everything.
pub struct ScanScheduler {
    urgent_every: Duration,
    monitor_every: Duration,
    timeframe_secs: i64,
    state: HashMap<String, SymbolScanState>,
}

impl ScanScheduler {
    pub fn new(urgent_every_secs: u64, monitor_every_secs: u64, timeframe_secs: u64) -> Self {
        Self {
            urgent_every: Duration::seconds(urgent_every_secs as i64),
            monitor_every: Duration::seconds(monitor_every_secs as i64),
            timeframe_secs: timeframe_secs.max(1) as i64,
            state: HashMap::new(),
        }
    }

    /// Whether the symbol should be scanned now; records the scan when
    /// it says yes.
    pub fn should_scan(
        &mut self,
        symbol: &str,
        urgency: ScanUrgency,
        now: DateTime<Utc>,
        market_open: bool,
    ) -> bool {
        if !market_open {
            return false;
        }

        let bar_index = now.timestamp().div_euclid(self.timeframe_secs);
        let state = self.state.entry(symbol.to_string()).or_default();

        let due = match urgency {
            ScanUrgency::Idle => state.last_bar_index != Some(bar_index),
            ScanUrgency::Monitoring | ScanUrgency::Urgent => {
                let cadence = if urgency == ScanUrgency::Urgent {
                    self.urgent_every
                } else {
                    self.monitor_every
                };
                match state.last_scan {
                    None => true,
                    Some(last) => now - last >= cadence,
                }
            }
        };

        if due {
            state.last_scan = Some(now);
            state.last_bar_index = Some(bar_index);
        }
        due
    }
}

//! Bounded closed-trade history

use crate::oracle::TradeSummary;
use crate::position::ClosedPosition;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// Ring of recent closed trades.
///
/// Feeds the decision context's trade-history summary and the status
/// command; old entries fall off the back.
pub struct TradeHistory {
    capacity: usize,
    entries: VecDeque<ClosedPosition>,
}

impl TradeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn record(&mut self, closed: ClosedPosition) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(closed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent trades, newest last, capped at `limit`
    pub fn summaries(&self, limit: usize) -> Vec<TradeSummary> {
        self.entries
            .iter()
            .rev()
            .take(limit)
            .rev()
            .map(|closed| TradeSummary {
                symbol: closed.position.symbol.clone(),
                direction: closed.position.direction,
                pnl: closed.realized_pnl,
                held_secs: (closed.closed_at - closed.position.opened_at).num_seconds(),
                exit_reason: closed.reason.code(),
            })
            .collect()
    }

    /// Fraction of recorded trades that closed positive
    pub fn win_rate(&self) -> Option<Decimal> {
        if self.entries.is_empty() {
            return None;
        }
        let wins = self
            .entries
            .iter()
            .filter(|c| c.realized_pnl > dec!(0))
            .count();
        Some(Decimal::from(wins) / Decimal::from(self.entries.len()))
    }

    pub fn total_pnl(&self) -> Decimal {
        self.entries.iter().map(|c| c.realized_pnl).sum()
    }
}

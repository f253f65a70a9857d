//! Open-position book

use super::{ClosedPosition, Direction, ExitReason, Position};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use uuid::Uuid;

/// Owns every open position and the realized history of the session.
///
/// All mutations flow from confirmed execution results; nothing here is
/// written on intent alone.
pub struct PositionBook {
    open: HashMap<Uuid, Position>,
    closed: Vec<ClosedPosition>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            open: HashMap::new(),
            closed: vec![],
        }
    }

    /// Record a confirmed entry fill
    pub fn insert(&mut self, position: Position) {
        self.open.insert(position.id, position);
    }

    /// Close a position at a confirmed exit price.
    ///
    /// Returns the realized record, or `None` for an unknown id.
    pub fn close(
        &mut self,
        id: Uuid,
        exit_price: Decimal,
        at: DateTime<Utc>,
        reason: ExitReason,
    ) -> Option<ClosedPosition> {
        let position = self.open.remove(&id)?;
        let realized = position.pnl_at(exit_price);
        let closed = ClosedPosition {
            position,
            exit_price,
            closed_at: at,
            realized_pnl: realized,
            reason,
        };
        self.closed.push(closed.clone());
        Some(closed)
    }

    /// Reduce a position by a confirmed partial fill.
    ///
    /// Returns the P&L realized on the closed lots. Peak profit scales
    /// down with the surviving lots, keeping giveback a price-path
    /// measure; the partial-exit flag dies only with the position.
    pub fn reduce(
        &mut self,
        id: Uuid,
        closed_lots: Decimal,
        exit_price: Decimal,
    ) -> Option<Decimal> {
        let position = self.open.get_mut(&id)?;
        if closed_lots <= dec!(0) || closed_lots >= position.lots {
            return None;
        }
        let realized = (exit_price - position.entry_price)
            * position.direction.sign()
            * closed_lots
            * position.contract_value;
        let remaining = position.lots - closed_lots;
        position.peak_profit = position.peak_profit * remaining / position.lots;
        position.lots = remaining;
        position.update_mark(exit_price);
        Some(realized)
    }

    /// Mark the first trailing milestone as taken
    pub fn set_partial_exit_taken(&mut self, id: Uuid) {
        if let Some(position) = self.open.get_mut(&id) {
            position.partial_exit_taken = true;
        }
    }

    /// Record a confirmed stop modification
    pub fn set_stop(&mut self, id: Uuid, stop: Decimal) {
        if let Some(position) = self.open.get_mut(&id) {
            position.stop = Some(stop);
        }
    }

    /// Re-mark every open position on a symbol
    pub fn update_marks(&mut self, symbol: &str, price: Decimal) {
        for position in self.open.values_mut() {
            if position.symbol == symbol {
                position.update_mark(price);
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Position> {
        self.open.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Position> {
        self.open.get_mut(&id)
    }

    /// Open positions on one symbol
    pub fn for_symbol(&self, symbol: &str) -> Vec<&Position> {
        self.open
            .values()
            .filter(|p| p.symbol == symbol)
            .collect()
    }

    /// Ids of open positions on one symbol
    pub fn ids_for_symbol(&self, symbol: &str) -> Vec<Uuid> {
        self.open
            .values()
            .filter(|p| p.symbol == symbol)
            .map(|p| p.id)
            .collect()
    }

    /// All open position ids
    pub fn open_ids(&self) -> Vec<Uuid> {
        self.open.keys().copied().collect()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn count_for(&self, symbol: &str) -> usize {
        self.open.values().filter(|p| p.symbol == symbol).count()
    }

    /// Sum of floating P&L across one symbol
    pub fn aggregate_floating(&self, symbol: &str) -> Decimal {
        self.open
            .values()
            .filter(|p| p.symbol == symbol)
            .map(|p| p.floating_pnl)
            .sum()
    }

    /// Sum of floating P&L across the whole book
    pub fn total_floating(&self) -> Decimal {
        self.open.values().map(|p| p.floating_pnl).sum()
    }

    /// Confidence recorded at the most recent entry on a symbol
    pub fn last_entry_confidence(&self, symbol: &str) -> Option<u8> {
        self.open
            .values()
            .filter(|p| p.symbol == symbol)
            .max_by_key(|p| p.opened_at)
            .map(|p| p.entry_confidence)
    }

    pub fn closed(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Realized P&L across the session's closed trades
    pub fn realized_pnl(&self) -> Decimal {
        self.closed.iter().map(|c| c.realized_pnl).sum()
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}

//! Position model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// P&L sign for a favourable price increase
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => dec!(1),
            Direction::Short => dec!(-1),
        }
    }
}

/// Why a position (or part of one) was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Floating loss hit the hard per-position ceiling
    HardStop,
    /// Market quality collapsed while the position was losing
    ThesisBreak,
    /// Gave back too much of the peak profit, full close
    TrailingFull,
    /// Gave back part of the peak profit, partial close
    TrailingPartial,
    /// Held too long without reaching the profit bar
    StaleUnproductive,
    /// Held past the hard age ceiling
    StaleHardCeiling,
    /// Decision service recommended the close
    OracleClose,
    /// Decision service reduced the position
    OracleScaleOut,
    /// Operator command
    Manual,
}

impl ExitReason {
    /// Stable code for logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            ExitReason::HardStop => "HARD_STOP",
            ExitReason::ThesisBreak => "THESIS_BREAK",
            ExitReason::TrailingFull => "TRAILING_FULL",
            ExitReason::TrailingPartial => "TRAILING_PARTIAL",
            ExitReason::StaleUnproductive => "STALE_UNPRODUCTIVE",
            ExitReason::StaleHardCeiling => "STALE_HARD_CEILING",
            ExitReason::OracleClose => "ORACLE_CLOSE",
            ExitReason::OracleScaleOut => "ORACLE_SCALE_OUT",
            ExitReason::Manual => "MANUAL",
        }
    }
}

/// An open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier
    pub id: Uuid,
    /// Traded symbol
    pub symbol: String,
    /// Trade direction
    pub direction: Direction,
    /// Volume in broker-normalized lots
    pub lots: Decimal,
    /// Confirmed entry price
    pub entry_price: Decimal,
    /// When the entry fill was confirmed
    pub opened_at: DateTime<Utc>,
    /// Protective stop, if placed
    pub stop: Option<Decimal>,
    /// Profit target, if placed
    pub target: Option<Decimal>,
    /// Account-currency value of a 1.0 price move per 1.0 lot
    pub contract_value: Decimal,
    /// Latest mark-to-market P&L
    pub floating_pnl: Decimal,
    /// High-water floating profit since entry
    pub peak_profit: Decimal,
    /// Whether the first trailing milestone was already taken
    pub partial_exit_taken: bool,
    /// Decision confidence recorded at entry
    pub entry_confidence: u8,
}

impl Position {
    /// Floating P&L at a given mark price
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.direction.sign() * self.lots * self.contract_value
    }

    /// Re-mark the position at the given price
    pub fn update_mark(&mut self, price: Decimal) {
        self.floating_pnl = self.pnl_at(price);
    }

    /// Seconds since the entry fill
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.opened_at).num_seconds()
    }
}

/// A fully closed position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    /// The position as it stood at close
    pub position: Position,
    /// Confirmed exit price
    pub exit_price: Decimal,
    /// When the exit fill was confirmed
    pub closed_at: DateTime<Utc>,
    /// Realized P&L including any earlier partial reductions
    pub realized_pnl: Decimal,
    /// Why it was closed
    pub reason: ExitReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_position(
        symbol: &str,
        direction: Direction,
        lots: Decimal,
        entry: Decimal,
    ) -> Position {
        Position {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            direction,
            lots,
            entry_price: entry,
            opened_at: Utc::now(),
            stop: None,
            target: None,
            contract_value: dec!(100000),
            floating_pnl: dec!(0),
            peak_profit: dec!(0),
            partial_exit_taken: false,
            entry_confidence: 70,
        }
    }

    #[test]
    fn test_long_pnl() {
        let mut pos = test_position("EURUSD", Direction::Long, dec!(0.5), dec!(1.1000));
        pos.update_mark(dec!(1.1020));
        // (1.1020 - 1.1000) * 0.5 * 100000 = 100
        assert_eq!(pos.floating_pnl, dec!(100.00000));
    }

    #[test]
    fn test_short_pnl() {
        let mut pos = test_position("EURUSD", Direction::Short, dec!(1), dec!(1.1000));
        pos.update_mark(dec!(1.1010));
        assert_eq!(pos.floating_pnl, dec!(-100.0000));
    }

    #[test]
    fn test_age_secs() {
        let mut pos = test_position("EURUSD", Direction::Long, dec!(1), dec!(1.1));
        pos.opened_at = Utc::now() - chrono::Duration::seconds(90);
        assert!(pos.age_secs(Utc::now()) >= 90);
    }

    #[test]
    fn test_exit_reason_codes_are_stable() {
        assert_eq!(ExitReason::HardStop.code(), "HARD_STOP");
        assert_eq!(ExitReason::TrailingPartial.code(), "TRAILING_PARTIAL");
    }
}

//! Tiered exit and profit-protection rules

use crate::oracle::{Action, Decision};
use crate::position::{ExitReason, Position};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// What the exit ladder decided for one position
#[derive(Debug, Clone, PartialEq)]
pub enum ExitDecision {
    Hold,
    Close { reason: ExitReason },
    /// Close this fraction of the position once
    PartialClose {
        fraction: Decimal,
        reason: ExitReason,
    },
}

/// Exit thresholds. Loss and profit levels are fractions of account
/// balance; giveback levels are fractions of the position's peak profit.
#[derive(Debug, Clone)]
pub struct ExitConfig {
    /// Floating loss that forces an immediate full close
    pub hard_stop_pct: Decimal,
    /// Market quality below this is a broken thesis
    pub quality_floor: Decimal,
    /// Thesis-break fires only past this loss; smaller losses ride
    pub thesis_min_loss_pct: Decimal,
    /// Giveback fraction that closes the whole position
    pub giveback_full_pct: Decimal,
    /// Giveback fraction that closes part of it, once
    pub giveback_partial_pct: Decimal,
    /// Fraction closed at the partial level
    pub partial_close_fraction: Decimal,
    /// Age after which an unproductive position is cut
    pub stale_after_secs: i64,
    /// Age that closes regardless of profit
    pub max_age_secs: i64,
    /// Profit bar a position must clear to be worth holding past
    /// `stale_after_secs`, as a fraction of balance
    pub min_profit_pct: Decimal,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            hard_stop_pct: dec!(0.01),
            quality_floor: dec!(0.4),
            thesis_min_loss_pct: dec!(0.002),
            giveback_full_pct: dec!(0.35),
            giveback_partial_pct: dec!(0.15),
            partial_close_fraction: dec!(0.5),
            stale_after_secs: 4 * 3600,
            max_age_secs: 24 * 3600,
            min_profit_pct: dec!(0.001),
        }
    }
}

/// Evaluates the exit ladder for open positions.
///
/// Tiers run in strict priority order and the first match wins:
/// hard stop, thesis break, peak-drawdown trailing, staleness, then the
/// decision service's own close. The peak is advanced before any
/// giveback arithmetic so a new high can never read as a giveback.
pub struct ExitEngine {
    config: ExitConfig,
}

impl ExitEngine {
    pub fn new(config: ExitConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        position: &mut Position,
        balance: Decimal,
        decision: Option<&Decision>,
        now: DateTime<Utc>,
    ) -> ExitDecision {
        if position.floating_pnl > position.peak_profit {
            position.peak_profit = position.floating_pnl;
        }

        // Tier 1: hard stop, cannot be overridden
        let hard_floor = -balance * self.config.hard_stop_pct;
        if position.floating_pnl <= hard_floor {
            return ExitDecision::Close {
                reason: ExitReason::HardStop,
            };
        }

        // Tier 2: broken thesis, only past the minimum-loss floor and
        // only when this cycle carries a fresh market view
        if let Some(quality) = decision.and_then(|d| d.quality_score) {
            let loss_floor = -balance * self.config.thesis_min_loss_pct;
            if quality < self.config.quality_floor && position.floating_pnl <= loss_floor {
                return ExitDecision::Close {
                    reason: ExitReason::ThesisBreak,
                };
            }
        }

        // Tier 3: peak-drawdown trailing stop
        if position.peak_profit > dec!(0) {
            let giveback = (position.peak_profit - position.floating_pnl) / position.peak_profit;
            if giveback > self.config.giveback_full_pct {
                return ExitDecision::Close {
                    reason: ExitReason::TrailingFull,
                };
            }
            if giveback > self.config.giveback_partial_pct && !position.partial_exit_taken {
                return ExitDecision::PartialClose {
                    fraction: self.config.partial_close_fraction,
                    reason: ExitReason::TrailingPartial,
                };
            }
        }

        // Tier 4: time-based staleness
        let age = position.age_secs(now);
        if age >= self.config.max_age_secs {
            return ExitDecision::Close {
                reason: ExitReason::StaleHardCeiling,
            };
        }
        if age >= self.config.stale_after_secs {
            let profit_bar = balance * self.config.min_profit_pct;
            if position.floating_pnl < profit_bar {
                return ExitDecision::Close {
                    reason: ExitReason::StaleUnproductive,
                };
            }
        }

        // Tier 5: the service's own exit call
        if let Some(decision) = decision {
            if decision.action == Action::Close {
                return ExitDecision::Close {
                    reason: ExitReason::OracleClose,
                };
            }
        }

        ExitDecision::Hold
    }
}

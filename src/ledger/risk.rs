//! Daily-loss and drawdown accounting

use super::LedgerState;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Initial balance unset or non-positive; loss percentages would be
    /// meaningless, so risk computations refuse to run.
    #[error("ledger uninitialized: initial balance {0} is not positive")]
    Uninitialized(Decimal),
}

/// Reason trading is halted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HaltReason {
    /// Daily loss limit crossed (fraction of initial balance)
    DailyLossLimit(Decimal),
    /// Total drawdown limit crossed (fraction of initial balance)
    TotalDrawdownLimit(Decimal),
}

impl HaltReason {
    /// Stable code for logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            HaltReason::DailyLossLimit(_) => "DAILY_LOSS_LIMIT",
            HaltReason::TotalDrawdownLimit(_) => "TOTAL_DRAWDOWN_LIMIT",
        }
    }
}

/// Emitted when the settlement-timezone calendar day changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRollover {
    pub previous_day: NaiveDate,
    pub new_day: NaiveDate,
    /// Balance the new day's loss limit is measured from
    pub daily_start_balance: Decimal,
}

/// Single-writer account risk state.
///
/// Both limits are measured against the immutable initial balance, never
/// against the current balance. Day rollover happens inside
/// [`RiskLedger::record_tick`] before any limit arithmetic, so the first
/// observation of a new day can never be judged against the old day's
/// start balance.
pub struct RiskLedger {
    initial_balance: Decimal,
    daily_start_balance: Decimal,
    last_reset_day: Option<NaiveDate>,
    peak_balance: Decimal,
    daily_realized_pnl: Decimal,
    latest_balance: Decimal,
    latest_equity: Decimal,
    timezone: Tz,
    daily_loss_limit_pct: Decimal,
    total_drawdown_limit_pct: Decimal,
}

impl RiskLedger {
    /// Create a fresh ledger.
    ///
    /// The settlement day is pinned on the first tick, so replayed
    /// history does not produce a spurious rollover at startup.
    pub fn new(
        initial_balance: Decimal,
        timezone: Tz,
        daily_loss_limit_pct: Decimal,
        total_drawdown_limit_pct: Decimal,
    ) -> Result<Self, LedgerError> {
        if initial_balance <= dec!(0) {
            return Err(LedgerError::Uninitialized(initial_balance));
        }
        Ok(Self {
            initial_balance,
            daily_start_balance: initial_balance,
            last_reset_day: None,
            peak_balance: initial_balance,
            daily_realized_pnl: dec!(0),
            latest_balance: initial_balance,
            latest_equity: initial_balance,
            timezone,
            daily_loss_limit_pct,
            total_drawdown_limit_pct,
        })
    }

    /// Rebuild a ledger from persisted state
    pub fn restore(
        state: LedgerState,
        timezone: Tz,
        daily_loss_limit_pct: Decimal,
        total_drawdown_limit_pct: Decimal,
    ) -> Result<Self, LedgerError> {
        if state.initial_balance <= dec!(0) {
            return Err(LedgerError::Uninitialized(state.initial_balance));
        }
        Ok(Self {
            initial_balance: state.initial_balance,
            daily_start_balance: state.daily_start_balance,
            last_reset_day: Some(state.last_reset_day),
            peak_balance: state.peak_balance,
            daily_realized_pnl: state.daily_realized_pnl,
            latest_balance: state.daily_start_balance,
            latest_equity: state.daily_start_balance,
            timezone,
            daily_loss_limit_pct,
            total_drawdown_limit_pct,
        })
    }

    /// Record an account observation.
    ///
    /// Returns a [`DayRollover`] when `at` falls on a new calendar day in
    /// the settlement timezone; the rollover is applied before the marks
    /// so subsequent limit checks see the new day.
    pub fn record_tick(
        &mut self,
        balance: Decimal,
        equity: Decimal,
        at: DateTime<Utc>,
    ) -> Option<DayRollover> {
        let day = at.with_timezone(&self.timezone).date_naive();

        let rollover = match self.last_reset_day {
            None => {
                // First observation pins the day without counting as a reset
                self.last_reset_day = Some(day);
                self.daily_start_balance = balance;
                self.daily_realized_pnl = dec!(0);
                None
            }
            Some(previous) if previous != day => {
                self.last_reset_day = Some(day);
                self.daily_start_balance = balance;
                self.daily_realized_pnl = dec!(0);
                Some(DayRollover {
                    previous_day: previous,
                    new_day: day,
                    daily_start_balance: balance,
                })
            }
            Some(_) => None,
        };

        self.latest_balance = balance;
        self.latest_equity = equity;
        if balance > self.peak_balance {
            self.peak_balance = balance;
        }
        if equity > self.peak_balance {
            self.peak_balance = equity;
        }

        rollover
    }

    /// Record P&L from a confirmed close
    pub fn record_realized(&mut self, pnl: Decimal) {
        self.daily_realized_pnl += pnl;
        self.latest_balance += pnl;
        if self.latest_balance > self.peak_balance {
            self.peak_balance = self.latest_balance;
        }
    }

    /// Equity-basis daily P&L: floating losses count against the limit
    pub fn daily_pnl(&self) -> Decimal {
        self.latest_equity - self.daily_start_balance
    }

    /// Realized-only P&L for the current settlement day
    pub fn daily_realized(&self) -> Decimal {
        self.daily_realized_pnl
    }

    /// Today's loss as a fraction of the initial balance (zero when up)
    pub fn daily_loss_pct(&self) -> Decimal {
        let pnl = self.daily_pnl();
        if pnl >= dec!(0) {
            dec!(0)
        } else {
            -pnl / self.initial_balance
        }
    }

    /// Giveback from peak as a fraction of the initial balance
    pub fn total_drawdown_pct(&self) -> Decimal {
        let drawdown = self.peak_balance - self.latest_equity;
        if drawdown <= dec!(0) {
            dec!(0)
        } else {
            drawdown / self.initial_balance
        }
    }

    /// True strictly past the daily loss limit.
    ///
    /// A loss of exactly the limit is not a breach; one unit past it is.
    pub fn is_daily_limit_breached(&self) -> bool {
        self.daily_loss_pct() > self.daily_loss_limit_pct
    }

    /// True strictly past the total drawdown limit
    pub fn is_total_limit_breached(&self) -> bool {
        self.total_drawdown_pct() > self.total_drawdown_limit_pct
    }

    /// The halt currently in force, if any. Daily loss is reported first
    /// when both limits are crossed.
    pub fn active_halt(&self) -> Option<HaltReason> {
        if self.is_daily_limit_breached() {
            return Some(HaltReason::DailyLossLimit(self.daily_loss_pct()));
        }
        if self.is_total_limit_breached() {
            return Some(HaltReason::TotalDrawdownLimit(self.total_drawdown_pct()));
        }
        None
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn daily_start_balance(&self) -> Decimal {
        self.daily_start_balance
    }

    pub fn peak_balance(&self) -> Decimal {
        self.peak_balance
    }

    pub fn latest_balance(&self) -> Decimal {
        self.latest_balance
    }

    pub fn latest_equity(&self) -> Decimal {
        self.latest_equity
    }

    /// Snapshot for the persistent store
    pub fn state(&self) -> LedgerState {
        LedgerState {
            initial_balance: self.initial_balance,
            daily_start_balance: self.daily_start_balance,
            last_reset_day: self
                .last_reset_day
                .unwrap_or_else(|| Utc::now().with_timezone(&self.timezone).date_naive()),
            peak_balance: self.peak_balance,
            daily_realized_pnl: self.daily_realized_pnl,
        }
    }
}

//! Entry admission control

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Where a symbol sits in the entry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPhase {
    /// Free to accept a new entry
    Idle,
    /// An order is on its way to the venue
    Submitting,
    /// A fill was confirmed; waiting out the settle window
    Settling,
}

/// Typed admission outcomes. These are expected control flow, not
/// errors; every rejection is logged with its code and counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRejection {
    /// A submission or settle window is already in flight
    InProgress,
    /// Too soon after the previous attempt
    Cooldown { remaining_secs: i64 },
    /// Account-wide or per-symbol position cap reached
    MaxPositions { open: usize, limit: usize },
    /// Fresh entry on a symbol that already has an open position
    AlreadyOpen,
}

impl EntryRejection {
    /// Stable code for logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            EntryRejection::InProgress => "IN_PROGRESS",
            EntryRejection::Cooldown { .. } => "COOLDOWN",
            EntryRejection::MaxPositions { .. } => "MAX_POSITIONS",
            EntryRejection::AlreadyOpen => "ALREADY_OPEN",
        }
    }
}

#[derive(Debug, Clone)]
struct SymbolEntryState {
    phase: EntryPhase,
    settle_until: Option<DateTime<Utc>>,
    last_attempt: Option<DateTime<Utc>>,
}

impl Default for SymbolEntryState {
    fn default() -> Self {
        Self {
            phase: EntryPhase::Idle,
            settle_until: None,
            last_attempt: None,
        }
    }
}

/// Entry gate configuration
#[derive(Debug, Clone)]
pub struct EntryGateConfig {
    /// Minimum gap between attempts on one symbol
    pub cooldown: Duration,
    /// How long a confirmed fill keeps the symbol in settling
    pub settle: Duration,
    /// Cap on open positions across the account
    pub max_account_positions: usize,
    /// Cap on open positions per symbol
    pub max_per_symbol: usize,
}

impl Default for EntryGateConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(10),
            settle: Duration::seconds(3),
            max_account_positions: 5,
            max_per_symbol: 3,
        }
    }
}

/// Per-symbol entry state machine: Idle -> Submitting -> Settling -> Idle.
///
/// Transitions are driven by confirmed execution results and the settle
/// deadline, never by a fixed sleep. The cooldown arms on every admitted
/// attempt, filled or venue-rejected alike.
pub struct EntryGate {
    config: EntryGateConfig,
    state: HashMap<String, SymbolEntryState>,
}

impl EntryGate {
    pub fn new(config: EntryGateConfig) -> Self {
        Self {
            config,
            state: HashMap::new(),
        }
    }

    /// Run the ordered admission checks for a fresh directional entry.
    ///
    /// On success the symbol moves to `Submitting` and the cooldown is
    /// armed; the caller must follow up with [`EntryGate::record_result`].
    pub fn admit(
        &mut self,
        symbol: &str,
        symbol_open_count: usize,
        account_open_count: usize,
        now: DateTime<Utc>,
    ) -> Result<(), EntryRejection> {
        let config = self.config.clone();
        let state = self.state.entry(symbol.to_string()).or_default();

        if state.phase != EntryPhase::Idle {
            return Err(EntryRejection::InProgress);
        }

        if let Some(last) = state.last_attempt {
            let since = now - last;
            if since < config.cooldown {
                return Err(EntryRejection::Cooldown {
                    remaining_secs: (config.cooldown - since).num_seconds(),
                });
            }
        }

        if account_open_count >= config.max_account_positions {
            return Err(EntryRejection::MaxPositions {
                open: account_open_count,
                limit: config.max_account_positions,
            });
        }
        if symbol_open_count >= config.max_per_symbol {
            return Err(EntryRejection::MaxPositions {
                open: symbol_open_count,
                limit: config.max_per_symbol,
            });
        }

        if symbol_open_count > 0 {
            return Err(EntryRejection::AlreadyOpen);
        }

        state.phase = EntryPhase::Submitting;
        state.last_attempt = Some(now);
        Ok(())
    }

    /// Record the confirmed outcome of the in-flight submission
    pub fn record_result(&mut self, symbol: &str, filled: bool, now: DateTime<Utc>) {
        let settle = self.config.settle;
        let state = self.state.entry(symbol.to_string()).or_default();
        if filled {
            state.phase = EntryPhase::Settling;
            state.settle_until = Some(now + settle);
        } else {
            state.phase = EntryPhase::Idle;
            state.settle_until = None;
        }
    }

    /// Advance settle deadlines
    pub fn tick(&mut self, now: DateTime<Utc>) {
        for state in self.state.values_mut() {
            if state.phase == EntryPhase::Settling {
                if let Some(until) = state.settle_until {
                    if now >= until {
                        state.phase = EntryPhase::Idle;
                        state.settle_until = None;
                    }
                }
            }
        }
    }

    pub fn phase(&self, symbol: &str) -> EntryPhase {
        self.state
            .get(symbol)
            .map(|s| s.phase)
            .unwrap_or(EntryPhase::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn gate() -> EntryGate {
        EntryGate::new(EntryGateConfig::default())
    }

    #[test]
    fn test_full_lifecycle() {
        let mut gate = gate();

        gate.admit("EURUSD", 0, 0, at(0)).unwrap();
        assert_eq!(gate.phase("EURUSD"), EntryPhase::Submitting);

        gate.record_result("EURUSD", true, at(1));
        assert_eq!(gate.phase("EURUSD"), EntryPhase::Settling);

        gate.tick(at(2));
        assert_eq!(gate.phase("EURUSD"), EntryPhase::Settling);

        gate.tick(at(4));
        assert_eq!(gate.phase("EURUSD"), EntryPhase::Idle);
    }

    #[test]
    fn test_in_progress_rejected_first() {
        let mut gate = gate();
        gate.admit("EURUSD", 0, 0, at(0)).unwrap();

        let rejection = gate.admit("EURUSD", 0, 0, at(0)).unwrap_err();
        assert_eq!(rejection, EntryRejection::InProgress);
        assert_eq!(rejection.code(), "IN_PROGRESS");
    }

    #[test]
    fn test_cooldown_after_attempt() {
        let mut gate = gate();
        gate.admit("EURUSD", 0, 0, at(0)).unwrap();
        // Venue rejected: back to idle, but the attempt armed the cooldown
        gate.record_result("EURUSD", false, at(1));

        let rejection = gate.admit("EURUSD", 0, 0, at(4)).unwrap_err();
        assert!(matches!(
            rejection,
            EntryRejection::Cooldown { remaining_secs } if remaining_secs == 6
        ));

        // Past the 10s window it admits again
        assert!(gate.admit("EURUSD", 0, 0, at(10)).is_ok());
    }

    #[test]
    fn test_account_position_cap() {
        let mut gate = gate();
        let rejection = gate.admit("EURUSD", 0, 5, at(0)).unwrap_err();
        assert!(matches!(
            rejection,
            EntryRejection::MaxPositions { open: 5, limit: 5 }
        ));
    }

    #[test]
    fn test_per_symbol_cap() {
        let mut gate = gate();
        let rejection = gate.admit("EURUSD", 3, 4, at(0)).unwrap_err();
        assert!(matches!(
            rejection,
            EntryRejection::MaxPositions { open: 3, limit: 3 }
        ));
    }

    #[test]
    fn test_already_open_requires_scaling_path() {
        let mut gate = gate();
        let rejection = gate.admit("EURUSD", 1, 1, at(0)).unwrap_err();
        assert_eq!(rejection, EntryRejection::AlreadyOpen);
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut gate = gate();
        gate.admit("EURUSD", 0, 0, at(0)).unwrap();
        assert!(gate.admit("XAUUSD", 0, 0, at(0)).is_ok());
    }

    #[test]
    fn test_settling_still_blocks_admission() {
        let mut gate = gate();
        gate.admit("EURUSD", 0, 0, at(0)).unwrap();
        gate.record_result("EURUSD", true, at(1));

        // Position count may still read zero until bookkeeping lands;
        // the settle window is what prevents a double submission.
        let rejection = gate.admit("EURUSD", 0, 1, at(2)).unwrap_err();
        assert_eq!(rejection, EntryRejection::InProgress);
    }
}

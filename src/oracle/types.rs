//! Decision service wire schema
//!
//! The response is parsed into a loose raw struct first, then validated
//! into [`Decision`]. Anything malformed is rejected with a typed error;
//! an unknown action is never silently downgraded to a hold.

use crate::account::AccountSnapshot;
use crate::gateway::LotSpec;
use crate::position::{Direction, Position};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// What the decision service wants done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Close,
    ScaleIn,
    ScaleOut,
    ModifyStop,
    Dca,
}

impl Action {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "BUY" => Some(Action::Buy),
            "SELL" => Some(Action::Sell),
            "HOLD" => Some(Action::Hold),
            "CLOSE" => Some(Action::Close),
            "SCALE_IN" => Some(Action::ScaleIn),
            "SCALE_OUT" => Some(Action::ScaleOut),
            "MODIFY_STOP" => Some(Action::ModifyStop),
            "DCA" => Some(Action::Dca),
            _ => None,
        }
    }

    /// Direction implied by a fresh entry action
    pub fn entry_direction(&self) -> Option<Direction> {
        match self {
            Action::Buy => Some(Direction::Long),
            Action::Sell => Some(Direction::Short),
            _ => None,
        }
    }
}

/// Stop or target specification from the wire: an absolute price or a
/// point distance from the entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopSpec {
    Price(Decimal),
    Points(Decimal),
}

impl StopSpec {
    /// Resolve to an absolute price for a protective stop
    pub fn resolve_stop(&self, entry: Decimal, direction: Direction, point: Decimal) -> Decimal {
        match self {
            StopSpec::Price(price) => *price,
            StopSpec::Points(points) => entry - direction.sign() * points * point,
        }
    }

    /// Resolve to an absolute price for a profit target
    pub fn resolve_target(&self, entry: Decimal, direction: Direction, point: Decimal) -> Decimal {
        match self {
            StopSpec::Price(price) => *price,
            StopSpec::Points(points) => entry + direction.sign() * points * point,
        }
    }
}

/// Validation failures for decision payloads
#[derive(Debug, Error)]
pub enum DecisionParseError {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("confidence {0} outside 0..=100")]
    ConfidenceOutOfRange(i64),
    #[error("action {action} requires a positive volume, got {lots:?}")]
    BadVolume {
        action: &'static str,
        lots: Option<Decimal>,
    },
    #[error("quality score {0} outside 0..=1")]
    QualityOutOfRange(Decimal),
    #[error("scale multiplier {0} must be positive")]
    BadMultiplier(Decimal),
    #[error("MODIFY_STOP requires a stop price or point distance")]
    MissingStop,
}

/// A validated decision
#[derive(Debug, Clone)]
pub struct Decision {
    pub action: Action,
    /// 0..=100
    pub confidence: u8,
    /// Entry volume for BUY / SELL
    pub lots: Option<Decimal>,
    /// Volume delta for SCALE_IN / SCALE_OUT / DCA
    pub delta_lots: Option<Decimal>,
    pub stop: Option<StopSpec>,
    pub target: Option<StopSpec>,
    /// Free text from the service, logged verbatim
    pub reason: String,
    /// Service-side cap on concurrent positions per symbol
    pub max_positions: Option<usize>,
    pub should_scale_in: bool,
    /// Multiplier applied to the scale-in delta
    pub scale_multiplier: Option<Decimal>,
    pub trade_type: Option<String>,
    /// Market quality in 0..=1; drives the thesis-break exit
    pub quality_score: Option<Decimal>,
}

impl Decision {
    /// The decision used whenever the service is unreachable or rejected
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            confidence: 0,
            lots: None,
            delta_lots: None,
            stop: None,
            target: None,
            reason: "decision service unavailable".to_string(),
            max_positions: None,
            should_scale_in: false,
            scale_multiplier: None,
            trade_type: None,
            quality_score: None,
        }
    }
}

/// Decision payload exactly as it arrives
#[derive(Debug, Default, Deserialize)]
pub struct RawDecision {
    pub action: String,
    #[serde(default)]
    pub confidence: Option<i64>,
    #[serde(default)]
    pub lots: Option<Decimal>,
    #[serde(default)]
    pub add_lots: Option<Decimal>,
    #[serde(default)]
    pub reduce_lots: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub stop_points: Option<Decimal>,
    #[serde(default)]
    pub target_price: Option<Decimal>,
    #[serde(default)]
    pub target_points: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub max_positions: Option<usize>,
    #[serde(default)]
    pub should_scale_in: Option<bool>,
    #[serde(default)]
    pub scale_multiplier: Option<Decimal>,
    #[serde(default)]
    pub trade_type: Option<String>,
    #[serde(default)]
    pub quality_score: Option<Decimal>,
}

impl RawDecision {
    /// Strict validation into a [`Decision`]
    pub fn validate(self) -> Result<Decision, DecisionParseError> {
        let action = Action::parse(&self.action)
            .ok_or_else(|| DecisionParseError::UnknownAction(self.action.clone()))?;

        let confidence = match self.confidence {
            None => 0,
            Some(c) if (0..=100).contains(&c) => c as u8,
            Some(c) => return Err(DecisionParseError::ConfidenceOutOfRange(c)),
        };

        let lots = match action {
            Action::Buy | Action::Sell => match self.lots {
                Some(lots) if lots > dec!(0) => Some(lots),
                other => {
                    return Err(DecisionParseError::BadVolume {
                        action: "entry",
                        lots: other,
                    })
                }
            },
            _ => self.lots.filter(|l| *l > dec!(0)),
        };

        let delta_lots = match action {
            Action::ScaleIn | Action::Dca => match self.add_lots {
                Some(lots) if lots > dec!(0) => Some(lots),
                other => {
                    return Err(DecisionParseError::BadVolume {
                        action: "scale-in",
                        lots: other,
                    })
                }
            },
            Action::ScaleOut => match self.reduce_lots {
                Some(lots) if lots > dec!(0) => Some(lots),
                other => {
                    return Err(DecisionParseError::BadVolume {
                        action: "scale-out",
                        lots: other,
                    })
                }
            },
            _ => None,
        };

        // A price wins over a point distance when both are present
        let stop = match (self.stop_price, self.stop_points) {
            (Some(price), _) => Some(StopSpec::Price(price)),
            (None, Some(points)) => Some(StopSpec::Points(points)),
            (None, None) => None,
        };
        let target = match (self.target_price, self.target_points) {
            (Some(price), _) => Some(StopSpec::Price(price)),
            (None, Some(points)) => Some(StopSpec::Points(points)),
            (None, None) => None,
        };

        if action == Action::ModifyStop && stop.is_none() {
            return Err(DecisionParseError::MissingStop);
        }

        if let Some(multiplier) = self.scale_multiplier {
            if multiplier <= dec!(0) {
                return Err(DecisionParseError::BadMultiplier(multiplier));
            }
        }

        if let Some(quality) = self.quality_score {
            if quality < dec!(0) || quality > dec!(1) {
                return Err(DecisionParseError::QualityOutOfRange(quality));
            }
        }

        Ok(Decision {
            action,
            confidence,
            lots,
            delta_lots,
            stop,
            target,
            reason: self.reason.unwrap_or_default(),
            max_positions: self.max_positions,
            should_scale_in: self.should_scale_in.unwrap_or(false),
            scale_multiplier: self.scale_multiplier,
            trade_type: self.trade_type,
            quality_score: self.quality_score,
        })
    }
}

/// One OHLCV bar, passed through to the service untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Open-position view sent to the service
#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    pub direction: Direction,
    pub lots: Decimal,
    pub entry_price: Decimal,
    pub floating_pnl: Decimal,
    pub age_secs: i64,
}

impl PositionSummary {
    pub fn from_position(position: &Position, now: DateTime<Utc>) -> Self {
        Self {
            direction: position.direction,
            lots: position.lots,
            entry_price: position.entry_price,
            floating_pnl: position.floating_pnl,
            age_secs: position.age_secs(now),
        }
    }
}

/// Recent closed-trade view sent to the service
#[derive(Debug, Clone, Serialize)]
pub struct TradeSummary {
    pub symbol: String,
    pub direction: Direction,
    pub pnl: Decimal,
    pub held_secs: i64,
    pub exit_reason: &'static str,
}

/// Everything the service sees for one symbol in one cycle
#[derive(Debug, Clone, Serialize)]
pub struct DecisionContext {
    pub symbol: String,
    pub account: AccountSnapshot,
    pub open_positions: Vec<PositionSummary>,
    pub recent_trades: Vec<TradeSummary>,
    /// Timeframe label to bar series, e.g. "M15" or "H1"
    pub candles: HashMap<String, Vec<Candle>>,
    pub lot_spec: LotSpec,
}

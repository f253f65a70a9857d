//! Execution gateway types

use crate::position::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Venue-side position identifier
pub type PositionId = Uuid;

/// A request to open a position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Traded symbol
    pub symbol: String,
    /// Trade direction
    pub direction: Direction,
    /// Volume in broker-normalized lots
    pub lots: Decimal,
    /// Protective stop price
    pub stop: Option<Decimal>,
    /// Profit target price
    pub target: Option<Decimal>,
    /// Free-text tag carried to the venue
    pub comment: String,
}

/// A confirmed execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Position the fill applies to
    pub position_id: PositionId,
    /// Traded symbol
    pub symbol: String,
    /// Trade direction
    pub direction: Direction,
    /// Confirmed price
    pub price: Decimal,
    /// Confirmed volume
    pub lots: Decimal,
    /// Venue timestamp
    pub executed_at: DateTime<Utc>,
}

/// Why the venue refused an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectCode {
    /// No quotes available for the symbol
    NoPrices,
    /// Volume outside broker constraints
    InvalidVolume,
    /// Market closed for the symbol
    MarketClosed,
    /// Not enough free margin
    InsufficientMargin,
    /// Unknown position id
    PositionNotFound,
    /// Anything else the venue reported
    Other(String),
}

impl RejectCode {
    /// Stable code for logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            RejectCode::NoPrices => "NO_PRICES",
            RejectCode::InvalidVolume => "INVALID_VOLUME",
            RejectCode::MarketClosed => "MARKET_CLOSED",
            RejectCode::InsufficientMargin => "INSUFFICIENT_MARGIN",
            RejectCode::PositionNotFound => "POSITION_NOT_FOUND",
            RejectCode::Other(_) => "OTHER",
        }
    }
}

/// Outcome of a gateway operation.
///
/// State elsewhere in the engine may change only on `Filled`; a rejected
/// order leaves everything exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecResult {
    /// The venue confirmed the execution
    Filled(Fill),
    /// The venue refused the order
    Rejected(RejectCode),
}

impl ExecResult {
    pub fn is_filled(&self) -> bool {
        matches!(self, ExecResult::Filled(_))
    }

    pub fn fill(&self) -> Option<&Fill> {
        match self {
            ExecResult::Filled(fill) => Some(fill),
            ExecResult::Rejected(_) => None,
        }
    }
}

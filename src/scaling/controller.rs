//! Position scaling guardrails

use crate::gateway::LotSpec;
use crate::oracle::Decision;
use crate::position::Position;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Why a scale-in was refused. Expected control flow, logged and
/// counted, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleRejection {
    /// No open position on the symbol to scale
    NoPosition,
    /// Aggregate floating P&L is not positive; adding to a loser is
    /// never allowed, DCA included
    NotInProfit(Decimal),
    /// New confidence does not clear the last entry by the required gap
    ConfidenceGap { last: u8, new: u8, required: u8 },
    /// Symbol already at its position ceiling
    MaxPositions { open: usize, limit: usize },
    /// Decision carried no usable volume delta
    NoVolume,
}

impl ScaleRejection {
    /// Stable code for logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            ScaleRejection::NoPosition => "NO_POSITION",
            ScaleRejection::NotInProfit(_) => "NOT_IN_PROFIT",
            ScaleRejection::ConfidenceGap { .. } => "CONFIDENCE_GAP",
            ScaleRejection::MaxPositions { .. } => "MAX_POSITIONS",
            ScaleRejection::NoVolume => "NO_VOLUME",
        }
    }
}

/// What a scale-out request amounts to after clamping
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleOutPlan {
    /// Reduce by this step-aligned volume
    Reduce(Decimal),
    /// Requested reduction covers the position; close it outright
    FullClose,
    /// Reduction normalized to nothing; ignore it
    Skip,
}

/// Scaling configuration
#[derive(Debug, Clone)]
pub struct ScalingConfig {
    /// Confidence points a scale-in must clear over the last entry
    pub confidence_gap: u8,
    /// Operator ceiling on positions per symbol, regardless of what the
    /// decision service asks for
    pub max_positions_ceiling: usize,
    /// Clamp band for the service's scale multiplier
    pub multiplier_min: Decimal,
    pub multiplier_max: Decimal,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            confidence_gap: 5,
            max_positions_ceiling: 3,
            multiplier_min: dec!(0.25),
            multiplier_max: dec!(2.0),
        }
    }
}

/// Applies the scale-in guardrails and scale-out clamps
pub struct ScalingController {
    config: ScalingConfig,
}

impl ScalingController {
    pub fn new(config: ScalingConfig) -> Self {
        Self { config }
    }

    /// Vet a SCALE_IN (or DCA) against the guardrails.
    ///
    /// Returns the normalized volume to add. Admission requires positive
    /// aggregate floating profit on the symbol, a confidence improvement
    /// over the most recent entry, and headroom under the tighter of the
    /// service's cap and the operator ceiling.
    pub fn evaluate_scale_in(
        &self,
        decision: &Decision,
        positions: &[&Position],
        lot_spec: &LotSpec,
    ) -> Result<Decimal, ScaleRejection> {
        if positions.is_empty() {
            return Err(ScaleRejection::NoPosition);
        }

        let aggregate: Decimal = positions.iter().map(|p| p.floating_pnl).sum();
        if aggregate <= dec!(0) {
            return Err(ScaleRejection::NotInProfit(aggregate));
        }

        let last_confidence = positions
            .iter()
            .max_by_key(|p| p.opened_at)
            .map(|p| p.entry_confidence)
            .unwrap_or(0);
        let required = last_confidence.saturating_add(self.config.confidence_gap);
        if decision.confidence < required {
            return Err(ScaleRejection::ConfidenceGap {
                last: last_confidence,
                new: decision.confidence,
                required: self.config.confidence_gap,
            });
        }

        let service_cap = decision.max_positions.unwrap_or(usize::MAX);
        let limit = service_cap.min(self.config.max_positions_ceiling);
        if positions.len() >= limit {
            return Err(ScaleRejection::MaxPositions {
                open: positions.len(),
                limit,
            });
        }

        let delta = decision.delta_lots.ok_or(ScaleRejection::NoVolume)?;
        let multiplier = decision
            .scale_multiplier
            .unwrap_or(dec!(1))
            .clamp(self.config.multiplier_min, self.config.multiplier_max);

        Ok(lot_spec.normalize(delta * multiplier))
    }

    /// Clamp a SCALE_OUT against what is actually open.
    ///
    /// Reducing risk is always admitted; the request is floored to the
    /// broker step and capped at the position volume. A reduction that
    /// reaches the full volume becomes an outright close.
    pub fn evaluate_scale_out(
        &self,
        decision: &Decision,
        position: &Position,
        lot_spec: &LotSpec,
    ) -> ScaleOutPlan {
        let requested = match decision.delta_lots {
            Some(lots) if lots > dec!(0) => lots,
            _ => return ScaleOutPlan::Skip,
        };

        if requested >= position.lots {
            return ScaleOutPlan::FullClose;
        }

        let reduce = lot_spec.floor_to_step(requested);
        if reduce <= dec!(0) {
            return ScaleOutPlan::Skip;
        }
        if reduce >= position.lots {
            return ScaleOutPlan::FullClose;
        }
        // Remainder below the broker minimum cannot stay open
        if position.lots - reduce < lot_spec.min_lot {
            return ScaleOutPlan::FullClose;
        }
        ScaleOutPlan::Reduce(reduce)
    }
}

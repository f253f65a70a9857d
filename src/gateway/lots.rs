//! Broker lot constraints and volume normalization

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Volume constraints published by the broker for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotSpec {
    /// Smallest tradable volume
    #[serde(default = "default_min_lot")]
    pub min_lot: Decimal,
    /// Largest tradable volume
    #[serde(default = "default_max_lot")]
    pub max_lot: Decimal,
    /// Volume increment
    #[serde(default = "default_lot_step")]
    pub lot_step: Decimal,
}

fn default_min_lot() -> Decimal {
    dec!(0.01)
}
fn default_max_lot() -> Decimal {
    dec!(100)
}
fn default_lot_step() -> Decimal {
    dec!(0.01)
}

impl Default for LotSpec {
    fn default() -> Self {
        Self {
            min_lot: dec!(0.01),
            max_lot: dec!(100),
            lot_step: dec!(0.01),
        }
    }
}

impl LotSpec {
    /// Floor a volume to the broker step without clamping.
    ///
    /// Used for reductions, where the result must never exceed what is
    /// actually open.
    pub fn floor_to_step(&self, lots: Decimal) -> Decimal {
        if self.lot_step <= Decimal::ZERO {
            return lots;
        }
        (lots / self.lot_step).floor() * self.lot_step
    }

    /// Normalize a requested volume to something the broker will accept:
    /// floored to the step, then clamped into `[min_lot, max_lot]`.
    ///
    /// Idempotent: normalizing an already-normalized volume returns it
    /// unchanged.
    pub fn normalize(&self, requested: Decimal) -> Decimal {
        let floored = self.floor_to_step(requested);
        floored.clamp(self.min_lot, self.max_lot)
    }

    /// Whether a volume is already step-aligned and within bounds
    pub fn is_normalized(&self, lots: Decimal) -> bool {
        self.normalize(lots) == lots
    }
}

//! Simulated execution gateway

use super::{ExecResult, ExecutionGateway, Fill, OrderRequest, PositionId, RejectCode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct SimPosition {
    symbol: String,
    direction: crate::position::Direction,
    lots: Decimal,
}

/// Deterministic gateway for paper runs and tests.
///
/// Fills at the last mark set for the symbol; the next operation can be
/// scripted to fail with a given reject code.
pub struct SimGateway {
    marks: Arc<RwLock<HashMap<String, Decimal>>>,
    positions: Arc<RwLock<HashMap<PositionId, SimPosition>>>,
    reject_next: Arc<RwLock<Option<RejectCode>>>,
    clock: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl SimGateway {
    pub fn new() -> Self {
        Self {
            marks: Arc::new(RwLock::new(HashMap::new())),
            positions: Arc::new(RwLock::new(HashMap::new())),
            reject_next: Arc::new(RwLock::new(None)),
            clock: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the fill price for a symbol
    pub async fn set_mark(&self, symbol: &str, price: Decimal) {
        self.marks.write().await.insert(symbol.to_string(), price);
    }

    /// Stamp fills with an event-stream time instead of the wall clock.
    ///
    /// Replays advance this alongside the marks so position age reflects
    /// the capture, not the run.
    pub async fn set_clock(&self, at: DateTime<Utc>) {
        *self.clock.write().await = Some(at);
    }

    /// Make the next operation come back rejected
    pub async fn script_reject(&self, code: RejectCode) {
        *self.reject_next.write().await = Some(code);
    }

    /// Venue-side open position count
    pub async fn open_count(&self) -> usize {
        self.positions.read().await.len()
    }

    async fn take_scripted_reject(&self) -> Option<RejectCode> {
        self.reject_next.write().await.take()
    }

    async fn fill_time(&self) -> DateTime<Utc> {
        (*self.clock.read().await).unwrap_or_else(Utc::now)
    }
}

impl Default for SimGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionGateway for SimGateway {
    async fn open(&self, request: OrderRequest) -> anyhow::Result<ExecResult> {
        if let Some(code) = self.take_scripted_reject().await {
            tracing::info!(symbol = %request.symbol, code = code.code(), "Sim order rejected");
            return Ok(ExecResult::Rejected(code));
        }

        let price = match self.marks.read().await.get(&request.symbol).copied() {
            Some(price) => price,
            None => return Ok(ExecResult::Rejected(RejectCode::NoPrices)),
        };

        let position_id = PositionId::new_v4();
        self.positions.write().await.insert(
            position_id,
            SimPosition {
                symbol: request.symbol.clone(),
                direction: request.direction,
                lots: request.lots,
            },
        );

        tracing::info!(symbol = %request.symbol, ?position_id, lots = %request.lots, "Sim order filled");
        Ok(ExecResult::Filled(Fill {
            position_id,
            symbol: request.symbol,
            direction: request.direction,
            price,
            lots: request.lots,
            executed_at: self.fill_time().await,
        }))
    }

    async fn close(&self, position_id: PositionId) -> anyhow::Result<ExecResult> {
        if let Some(code) = self.take_scripted_reject().await {
            return Ok(ExecResult::Rejected(code));
        }

        let position = match self.positions.write().await.remove(&position_id) {
            Some(position) => position,
            None => return Ok(ExecResult::Rejected(RejectCode::PositionNotFound)),
        };
        let price = match self.marks.read().await.get(&position.symbol).copied() {
            Some(price) => price,
            None => return Ok(ExecResult::Rejected(RejectCode::NoPrices)),
        };

        tracing::info!(?position_id, "Sim position closed");
        Ok(ExecResult::Filled(Fill {
            position_id,
            symbol: position.symbol,
            direction: position.direction,
            price,
            lots: position.lots,
            executed_at: self.fill_time().await,
        }))
    }

    async fn partial_close(
        &self,
        position_id: PositionId,
        lots: Decimal,
    ) -> anyhow::Result<ExecResult> {
        if let Some(code) = self.take_scripted_reject().await {
            return Ok(ExecResult::Rejected(code));
        }

        let mut positions = self.positions.write().await;
        let position = match positions.get_mut(&position_id) {
            Some(position) => position,
            None => return Ok(ExecResult::Rejected(RejectCode::PositionNotFound)),
        };
        if lots <= dec!(0) || lots >= position.lots {
            return Ok(ExecResult::Rejected(RejectCode::InvalidVolume));
        }
        let price = match self.marks.read().await.get(&position.symbol).copied() {
            Some(price) => price,
            None => return Ok(ExecResult::Rejected(RejectCode::NoPrices)),
        };
        position.lots -= lots;
        let symbol = position.symbol.clone();
        let direction = position.direction;
        drop(positions);

        Ok(ExecResult::Filled(Fill {
            position_id,
            symbol,
            direction,
            price,
            lots,
            executed_at: self.fill_time().await,
        }))
    }

    async fn modify_stop(
        &self,
        position_id: PositionId,
        stop: Decimal,
    ) -> anyhow::Result<ExecResult> {
        if let Some(code) = self.take_scripted_reject().await {
            return Ok(ExecResult::Rejected(code));
        }

        let positions = self.positions.read().await;
        let position = match positions.get(&position_id) {
            Some(position) => position,
            None => return Ok(ExecResult::Rejected(RejectCode::PositionNotFound)),
        };

        let fill = Fill {
            position_id,
            symbol: position.symbol.clone(),
            direction: position.direction,
            price: stop,
            lots: position.lots,
            executed_at: self.fill_time().await,
        };
        Ok(ExecResult::Filled(fill))
    }
}

//! Execution gateway module
//!
//! The single chokepoint between engine intent and venue-side position
//! changes. Callers normalize volumes through [`LotSpec`] before
//! submission and mutate engine state only from confirmed results.

mod lots;
mod sim;
mod types;

pub use lots::LotSpec;
pub use sim::SimGateway;
pub use types::{ExecResult, Fill, OrderRequest, PositionId, RejectCode};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for execution gateway implementations
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Open a new position
    async fn open(&self, request: OrderRequest) -> anyhow::Result<ExecResult>;
    /// Close a position entirely
    async fn close(&self, position_id: PositionId) -> anyhow::Result<ExecResult>;
    /// Close part of a position
    async fn partial_close(
        &self,
        position_id: PositionId,
        lots: Decimal,
    ) -> anyhow::Result<ExecResult>;
    /// Move the protective stop
    async fn modify_stop(
        &self,
        position_id: PositionId,
        stop: Decimal,
    ) -> anyhow::Result<ExecResult>;
}

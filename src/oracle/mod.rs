//! Decision oracle module
//!
//! Typed client for the external decision service: context assembly,
//! strict response validation, bounded timeout, no retries.

mod client;
mod types;

pub use client::{OracleClient, OracleConfig, OracleError};
pub use types::{
    Action, Candle, Decision, DecisionContext, DecisionParseError, PositionSummary, RawDecision,
    StopSpec, TradeSummary,
};

use async_trait::async_trait;

/// Seam between the engine and whatever produces decisions.
///
/// Production wires [`OracleClient`]; tests and replays can script
/// deterministic responses.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn decide(&self, context: &DecisionContext) -> Result<Decision, OracleError>;
}

#[async_trait]
impl DecisionSource for OracleClient {
    async fn decide(&self, context: &DecisionContext) -> Result<Decision, OracleError> {
        OracleClient::decide(self, context).await
    }
}

//! HTTP client for the decision service
//!
//! One POST per consultation with a bounded timeout and no client-side
//! retries. A failed or malformed response surfaces as a typed error;
//! the caller holds and waits for the next scheduled cycle.

use super::types::{Decision, DecisionContext, DecisionParseError, RawDecision};
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Decision service failures
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("decision request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decision transport failed: {0}")]
    Transport(reqwest::Error),
    #[error("decision service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("decision payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed decision: {0}")]
    Malformed(#[from] DecisionParseError),
}

/// Configuration for the decision client
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Full URL the context is POSTed to
    pub endpoint: String,
    /// Hard deadline for one consultation
    pub timeout: Duration,
}

/// Client for the external decision service
pub struct OracleClient {
    config: OracleConfig,
    client: Client,
    consecutive_failures: AtomicU32,
}

impl OracleClient {
    pub fn new(config: OracleConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            consecutive_failures: AtomicU32::new(0),
        })
    }

    /// Consult the service for one symbol.
    ///
    /// Exactly one request; any failure maps to an [`OracleError`] and
    /// the internal failure streak is advanced for observability.
    pub async fn decide(&self, context: &DecisionContext) -> Result<Decision, OracleError> {
        let started = Instant::now();

        let result = self.decide_inner(context).await;
        telemetry::record_latency(LatencyMetric::OracleDecision, started.elapsed());
        telemetry::inc_counter(CounterMetric::OracleRequests);

        match result {
            Ok(decision) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                Ok(decision)
            }
            Err(err) => {
                let streak = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                telemetry::inc_counter(CounterMetric::OracleFailures);
                tracing::warn!(
                    symbol = %context.symbol,
                    error = %err,
                    consecutive_failures = streak,
                    "Decision request failed"
                );
                Err(err)
            }
        }
    }

    async fn decide_inner(&self, context: &DecisionContext) -> Result<Decision, OracleError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(context)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout)
                } else {
                    OracleError::Transport(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status { status, body });
        }

        let body = response.text().await.map_err(OracleError::Transport)?;
        let raw: RawDecision = serde_json::from_str(&body)?;
        let decision = raw.validate()?;

        tracing::debug!(
            symbol = %context.symbol,
            action = ?decision.action,
            confidence = decision.confidence,
            reason = %decision.reason,
            "Decision received"
        );
        Ok(decision)
    }

    /// Failures since the last successful consultation
    pub fn failure_streak(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_timeout() {
        let client = OracleClient::new(OracleConfig {
            endpoint: "http://localhost:9000/decide".to_string(),
            timeout: Duration::from_secs(8),
        })
        .unwrap();
        assert_eq!(client.failure_streak(), 0);
    }

    #[test]
    fn test_error_display_names_the_budget() {
        let err = OracleError::Timeout(Duration::from_secs(8));
        assert!(err.to_string().contains("8s"));
    }

    #[test]
    fn test_json_error_maps_to_typed_variant() {
        let parse: Result<RawDecision, _> = serde_json::from_str("{nope");
        let err: OracleError = parse.unwrap_err().into();
        assert!(matches!(err, OracleError::Json(_)));
    }
}

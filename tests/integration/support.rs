//! Shared fixtures for integration tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use prop_sentry::account::AccountSnapshot;
use prop_sentry::config::Config;
use prop_sentry::oracle::{Decision, DecisionContext, DecisionSource, OracleError, RawDecision};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Decision source that plays back per-symbol scripted responses in
/// order and holds once a symbol's script runs out.
pub struct StubOracle {
    responses: Mutex<HashMap<String, VecDeque<Decision>>>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub async fn push(&self, symbol: &str, json: &str) {
        let decision = serde_json::from_str::<RawDecision>(json)
            .expect("scripted decision must be valid json")
            .validate()
            .expect("scripted decision must validate");
        self.responses
            .lock()
            .await
            .entry(symbol.to_string())
            .or_default()
            .push_back(decision);
    }
}

#[async_trait]
impl DecisionSource for StubOracle {
    async fn decide(&self, context: &DecisionContext) -> Result<Decision, OracleError> {
        Ok(self
            .responses
            .lock()
            .await
            .get_mut(&context.symbol)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(Decision::hold))
    }
}

/// Two-symbol configuration with a UTC settlement day, an always-open
/// week, and a ledger path inside the given directory.
pub fn test_config(dir: &std::path::Path) -> Config {
    let toml = format!(
        r#"
        [account]
        initial_balance = 100000
        settlement_timezone = "UTC"

        [oracle]
        endpoint = "http://localhost:0/decide"

        [[symbols]]
        name = "EURUSD"
        contract_value = 100000
        point = 0.0001

        [[symbols]]
        name = "XAUUSD"
        contract_value = 100
        point = 0.01

        [risk]
        ledger_path = "{}/ledger.json"

        [calendar]
        closed_weekdays = []
        "#,
        dir.display()
    );
    toml::from_str(&toml).expect("test config must parse")
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn snapshot(balance: Decimal, equity: Decimal, taken_at: DateTime<Utc>) -> AccountSnapshot {
    AccountSnapshot {
        balance,
        equity,
        margin_used: dec!(0),
        currency: "USD".to_string(),
        taken_at,
    }
}

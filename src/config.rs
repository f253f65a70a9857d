//! Configuration types for prop-sentry

use crate::entry::EntryGateConfig;
use crate::exits::ExitConfig;
use crate::gateway::LotSpec;
use crate::oracle::OracleConfig;
use crate::scaling::ScalingConfig;
use crate::scheduler::{parse_weekday, TradingCalendar, UrgencyThresholds};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    pub oracle: OracleSectionConfig,
    pub symbols: Vec<SymbolConfig>,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub scaling: ScalingSectionConfig,
    #[serde(default)]
    pub exits: ExitSectionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Account identity and settlement rules
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Funded balance the limits are measured against, set once
    pub initial_balance: Decimal,
    /// Account currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Timezone whose midnight defines the trading day
    #[serde(default = "default_settlement_timezone")]
    pub settlement_timezone: Tz,
}

/// Loss limits and ledger persistence
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Daily loss limit as a fraction of initial balance
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit_pct: Decimal,

    /// Total drawdown limit as a fraction of initial balance
    #[serde(default = "default_total_drawdown_limit")]
    pub total_drawdown_limit_pct: Decimal,

    /// Where the ledger snapshot lives
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

fn default_daily_loss_limit() -> Decimal {
    Decimal::new(5, 2) // 0.05 = 5%
}
fn default_total_drawdown_limit() -> Decimal {
    Decimal::new(10, 2) // 0.10 = 10%
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("state/ledger.json")
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            daily_loss_limit_pct: default_daily_loss_limit(),
            total_drawdown_limit_pct: default_total_drawdown_limit(),
            ledger_path: default_ledger_path(),
        }
    }
}

/// Decision service connection
#[derive(Debug, Clone, Deserialize)]
pub struct OracleSectionConfig {
    /// URL the decision context is POSTed to
    pub endpoint: String,
    /// Hard deadline per consultation, seconds
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_oracle_timeout_secs() -> u64 {
    8
}

impl OracleSectionConfig {
    pub fn to_client_config(&self) -> OracleConfig {
        OracleConfig {
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// One traded symbol
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolConfig {
    /// Broker symbol name
    pub name: String,
    /// Account-currency value of a 1.0 price move per 1.0 lot
    pub contract_value: Decimal,
    /// Smallest price increment, used to resolve point distances
    pub point: Decimal,
    /// Broker volume constraints
    #[serde(default)]
    pub lots: LotSpec,
}

/// Entry gate settings
#[derive(Debug, Clone, Deserialize)]
pub struct EntryConfig {
    /// Minimum gap between entry attempts on one symbol, seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// How long a confirmed fill keeps the symbol settling, seconds
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    /// Cap on open positions across the account
    #[serde(default = "default_max_account_positions")]
    pub max_account_positions: usize,

    /// Cap on open positions per symbol
    #[serde(default = "default_max_per_symbol")]
    pub max_per_symbol: usize,
}

fn default_cooldown_secs() -> u64 {
    10
}
fn default_settle_secs() -> u64 {
    3
}
fn default_max_account_positions() -> usize {
    5
}
fn default_max_per_symbol() -> usize {
    3
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 10,
            settle_secs: 3,
            max_account_positions: 5,
            max_per_symbol: 3,
        }
    }
}

impl EntryConfig {
    pub fn to_gate_config(&self) -> EntryGateConfig {
        EntryGateConfig {
            cooldown: chrono::Duration::seconds(self.cooldown_secs as i64),
            settle: chrono::Duration::seconds(self.settle_secs as i64),
            max_account_positions: self.max_account_positions,
            max_per_symbol: self.max_per_symbol,
        }
    }
}

/// Scaling guardrail settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingSectionConfig {
    /// Confidence points a scale-in must clear over the last entry
    #[serde(default = "default_confidence_gap")]
    pub confidence_gap: u8,

    /// Operator ceiling on positions per symbol
    #[serde(default = "default_max_positions_ceiling")]
    pub max_positions_ceiling: usize,

    /// Clamp band for the service's scale multiplier
    #[serde(default = "default_multiplier_min")]
    pub multiplier_min: Decimal,
    #[serde(default = "default_multiplier_max")]
    pub multiplier_max: Decimal,
}

fn default_confidence_gap() -> u8 {
    5
}
fn default_max_positions_ceiling() -> usize {
    3
}
fn default_multiplier_min() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_multiplier_max() -> Decimal {
    Decimal::new(2, 0)
}

impl Default for ScalingSectionConfig {
    fn default() -> Self {
        Self {
            confidence_gap: 5,
            max_positions_ceiling: 3,
            multiplier_min: default_multiplier_min(),
            multiplier_max: default_multiplier_max(),
        }
    }
}

impl ScalingSectionConfig {
    pub fn to_controller_config(&self) -> ScalingConfig {
        ScalingConfig {
            confidence_gap: self.confidence_gap,
            max_positions_ceiling: self.max_positions_ceiling,
            multiplier_min: self.multiplier_min,
            multiplier_max: self.multiplier_max,
        }
    }
}

/// Exit ladder settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExitSectionConfig {
    /// Floating loss forcing a full close, fraction of balance
    #[serde(default = "default_hard_stop_pct")]
    pub hard_stop_pct: Decimal,

    /// Market quality below this is a broken thesis
    #[serde(default = "default_quality_floor")]
    pub quality_floor: Decimal,

    /// Thesis-break loss floor, fraction of balance
    #[serde(default = "default_thesis_min_loss_pct")]
    pub thesis_min_loss_pct: Decimal,

    /// Giveback fraction closing the whole position
    #[serde(default = "default_giveback_full_pct")]
    pub giveback_full_pct: Decimal,

    /// Giveback fraction closing part of it, once
    #[serde(default = "default_giveback_partial_pct")]
    pub giveback_partial_pct: Decimal,

    /// Fraction closed at the partial level
    #[serde(default = "default_partial_close_fraction")]
    pub partial_close_fraction: Decimal,

    /// Age after which an unproductive position is cut, seconds
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,

    /// Age that closes regardless of profit, seconds
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,

    /// Profit bar for holding past staleness, fraction of balance
    #[serde(default = "default_min_profit_pct")]
    pub min_profit_pct: Decimal,
}

fn default_hard_stop_pct() -> Decimal {
    Decimal::new(1, 2) // 0.01 = 1%
}
fn default_quality_floor() -> Decimal {
    Decimal::new(4, 1) // 0.4
}
fn default_thesis_min_loss_pct() -> Decimal {
    Decimal::new(2, 3) // 0.002 = 0.2%
}
fn default_giveback_full_pct() -> Decimal {
    Decimal::new(35, 2) // 0.35
}
fn default_giveback_partial_pct() -> Decimal {
    Decimal::new(15, 2) // 0.15
}
fn default_partial_close_fraction() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_stale_after_secs() -> i64 {
    4 * 3600
}
fn default_max_age_secs() -> i64 {
    24 * 3600
}
fn default_min_profit_pct() -> Decimal {
    Decimal::new(1, 3) // 0.001 = 0.1%
}

impl Default for ExitSectionConfig {
    fn default() -> Self {
        Self {
            hard_stop_pct: default_hard_stop_pct(),
            quality_floor: default_quality_floor(),
            thesis_min_loss_pct: default_thesis_min_loss_pct(),
            giveback_full_pct: default_giveback_full_pct(),
            giveback_partial_pct: default_giveback_partial_pct(),
            partial_close_fraction: default_partial_close_fraction(),
            stale_after_secs: default_stale_after_secs(),
            max_age_secs: default_max_age_secs(),
            min_profit_pct: default_min_profit_pct(),
        }
    }
}

impl ExitSectionConfig {
    pub fn to_engine_config(&self) -> ExitConfig {
        ExitConfig {
            hard_stop_pct: self.hard_stop_pct,
            quality_floor: self.quality_floor,
            thesis_min_loss_pct: self.thesis_min_loss_pct,
            giveback_full_pct: self.giveback_full_pct,
            giveback_partial_pct: self.giveback_partial_pct,
            partial_close_fraction: self.partial_close_fraction,
            stale_after_secs: self.stale_after_secs,
            max_age_secs: self.max_age_secs,
            min_profit_pct: self.min_profit_pct,
        }
    }
}

/// Scan cadence and urgency thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Urgent-tier scan interval, seconds
    #[serde(default = "default_urgent_secs")]
    pub urgent_secs: u64,

    /// Monitoring-tier scan interval, seconds
    #[serde(default = "default_monitoring_secs")]
    pub monitoring_secs: u64,

    /// Base timeframe for idle-tier bar detection, seconds
    #[serde(default = "default_timeframe_secs")]
    pub timeframe_secs: u64,

    /// Single-position loss promoting to urgent, fraction of balance
    #[serde(default = "default_single_loss_pct")]
    pub single_loss_pct: Decimal,

    /// Aggregate symbol loss promoting to urgent, fraction of balance
    #[serde(default = "default_aggregate_loss_pct")]
    pub aggregate_loss_pct: Decimal,

    /// Absolute floating profit worth protecting, account currency
    #[serde(default = "default_protect_profit_abs")]
    pub protect_profit_abs: Decimal,
}

fn default_urgent_secs() -> u64 {
    5
}
fn default_monitoring_secs() -> u64 {
    10
}
fn default_timeframe_secs() -> u64 {
    900
}
fn default_single_loss_pct() -> Decimal {
    Decimal::new(3, 3) // 0.003 = 0.3%
}
fn default_aggregate_loss_pct() -> Decimal {
    Decimal::new(1, 2) // 0.01 = 1%
}
fn default_protect_profit_abs() -> Decimal {
    Decimal::new(500, 0)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            urgent_secs: 5,
            monitoring_secs: 10,
            timeframe_secs: 900,
            single_loss_pct: default_single_loss_pct(),
            aggregate_loss_pct: default_aggregate_loss_pct(),
            protect_profit_abs: default_protect_profit_abs(),
        }
    }
}

impl SchedulerConfig {
    pub fn to_thresholds(&self) -> UrgencyThresholds {
        UrgencyThresholds {
            single_loss_pct: self.single_loss_pct,
            aggregate_loss_pct: self.aggregate_loss_pct,
            protect_profit_abs: self.protect_profit_abs,
        }
    }
}

/// Venue session hours
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Venue timezone for session windows
    #[serde(default = "default_venue_timezone")]
    pub timezone: Tz,

    #[serde(default)]
    pub open_hour: u32,
    #[serde(default)]
    pub open_minute: u32,
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
    #[serde(default)]
    pub close_minute: u32,

    /// Weekday names the venue is closed, e.g. ["sat", "sun"]
    #[serde(default = "default_closed_weekdays")]
    pub closed_weekdays: Vec<String>,
}

fn default_settlement_timezone() -> Tz {
    chrono_tz::America::New_York
}
fn default_venue_timezone() -> Tz {
    chrono_tz::America::New_York
}
fn default_currency() -> String {
    "USD".to_string()
}
fn default_close_hour() -> u32 {
    24
}
fn default_closed_weekdays() -> Vec<String> {
    vec!["sat".to_string(), "sun".to_string()]
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: default_venue_timezone(),
            open_hour: 0,
            open_minute: 0,
            close_hour: 24,
            close_minute: 0,
            closed_weekdays: default_closed_weekdays(),
        }
    }
}

impl CalendarConfig {
    pub fn to_calendar(&self) -> anyhow::Result<TradingCalendar> {
        let closed = self
            .closed_weekdays
            .iter()
            .map(|raw| parse_weekday(raw))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(TradingCalendar::new(
            self.timezone,
            self.open_hour,
            self.open_minute,
            self.close_hour,
            self.close_minute,
            closed,
        ))
    }
}

/// Engine plumbing
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Operator command inbox capacity
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Closed trades kept for context and status
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Recent trades included in each decision context
    #[serde(default = "default_context_trades")]
    pub context_trades: usize,
}

fn default_inbox_capacity() -> usize {
    32
}
fn default_history_capacity() -> usize {
    200
}
fn default_context_trades() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 32,
            history_capacity: 200,
            context_trades: 10,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Look up a symbol's static configuration
    pub fn symbol(&self, name: &str) -> Option<&SymbolConfig> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

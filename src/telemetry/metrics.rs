//! Prometheus metrics

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One decision-service consultation
    OracleDecision,
    /// One gateway operation round trip
    GatewayOrder,
    /// One full evaluation cycle
    Cycle,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Latest account balance
    Balance,
    /// Latest account equity
    Equity,
    /// Equity-basis daily P&L
    DailyPnl,
    /// Drawdown from peak as a fraction of initial balance
    DrawdownPct,
    /// Open position count
    OpenPositions,
    /// Account peak balance
    PeakBalance,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Evaluation cycles run
    Cycles,
    /// Decision-service consultations
    OracleRequests,
    /// Failed consultations (timeout, transport, malformed)
    OracleFailures,
    /// Entries refused by the gate
    EntriesRejected,
    /// Scale-ins refused by the guardrails
    ScalesRejected,
    /// Orders the venue refused
    OrdersRejected,
    /// Exit-ladder closes
    ExitsFired,
    /// Settlement-day rollovers
    DayRollovers,
    /// Cycles spent under a limit halt
    LimitHalts,
}

/// Start the Prometheus exposition endpoint
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    tracing::info!(port, "Metrics endpoint listening");
    Ok(())
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let name = match metric {
        LatencyMetric::OracleDecision => "propsentry_oracle_decision_latency_ms",
        LatencyMetric::GatewayOrder => "propsentry_gateway_order_latency_ms",
        LatencyMetric::Cycle => "propsentry_cycle_latency_ms",
    };
    histogram!(name).record(duration.as_millis() as f64);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::Balance => "propsentry_balance_usd",
        GaugeMetric::Equity => "propsentry_equity_usd",
        GaugeMetric::DailyPnl => "propsentry_daily_pnl_usd",
        GaugeMetric::DrawdownPct => "propsentry_drawdown_pct",
        GaugeMetric::OpenPositions => "propsentry_open_positions",
        GaugeMetric::PeakBalance => "propsentry_peak_balance_usd",
    };
    gauge!(name).set(value);
}

/// Bump a counter
pub fn inc_counter(metric: CounterMetric) {
    let name = match metric {
        CounterMetric::Cycles => "propsentry_cycles_total",
        CounterMetric::OracleRequests => "propsentry_oracle_requests_total",
        CounterMetric::OracleFailures => "propsentry_oracle_failures_total",
        CounterMetric::EntriesRejected => "propsentry_entries_rejected_total",
        CounterMetric::ScalesRejected => "propsentry_scales_rejected_total",
        CounterMetric::OrdersRejected => "propsentry_orders_rejected_total",
        CounterMetric::ExitsFired => "propsentry_exits_fired_total",
        CounterMetric::DayRollovers => "propsentry_day_rollovers_total",
        CounterMetric::LimitHalts => "propsentry_limit_halts_total",
    };
    counter!(name).increment(1);
}

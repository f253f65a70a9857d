//! Per-cycle orchestration
//!
//! One evaluation cycle runs the fixed sequence: operator commands,
//! ledger tick (with day rollover), mark updates, halt check, decision
//! collection for symbols due a scan, the exit ladder over every open
//! position, then at most one admitted action per scanned symbol.

use crate::account::AccountSnapshot;
use crate::commands::{Command, CommandInbox};
use crate::config::{Config, SymbolConfig};
use crate::entry::EntryGate;
use crate::exits::{ExitDecision, ExitEngine};
use crate::gateway::{ExecResult, ExecutionGateway, LotSpec, OrderRequest};
use crate::history::TradeHistory;
use crate::ledger::{HaltReason, LedgerStore, RiskLedger};
use crate::oracle::{Action, Candle, Decision, DecisionContext, DecisionSource, PositionSummary};
use crate::position::{ExitReason, Position, PositionBook};
use crate::scaling::{ScaleOutPlan, ScalingController};
use crate::scheduler::{classify, ScanScheduler, TradingCalendar, UrgencyThresholds};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one evaluation cycle did
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Symbols consulted this cycle
    pub scanned: Vec<String>,
    pub entries: usize,
    pub scale_ins: usize,
    pub scale_outs: usize,
    /// Full and partial exit fills, ladder and command driven
    pub exits: usize,
    pub stops_moved: usize,
    pub rollover: bool,
    /// Halt in force during this cycle, if any
    pub halted: Option<HaltReason>,
}

/// Drives every component for one account against one gateway.
///
/// The engine is single-writer: all state mutation happens inside
/// [`Engine::run_cycle`], and only on confirmed execution results.
pub struct Engine {
    ledger: RiskLedger,
    store: LedgerStore,
    book: PositionBook,
    gate: EntryGate,
    scaling: ScalingController,
    exits: ExitEngine,
    scheduler: ScanScheduler,
    thresholds: UrgencyThresholds,
    calendar: TradingCalendar,
    history: TradeHistory,
    inbox: CommandInbox,
    oracle: Arc<dyn DecisionSource>,
    gateway: Arc<dyn ExecutionGateway>,
    symbols: Vec<SymbolConfig>,
    marks: HashMap<String, Decimal>,
    paused: bool,
    was_halted: bool,
    context_trades: usize,
    candle_label: String,
}

impl Engine {
    /// Build an engine from configuration, restoring the risk ledger
    /// from disk when a snapshot exists.
    pub fn new(
        config: &Config,
        oracle: Arc<dyn DecisionSource>,
        gateway: Arc<dyn ExecutionGateway>,
        inbox: CommandInbox,
    ) -> anyhow::Result<Self> {
        let store = LedgerStore::new(&config.risk.ledger_path);
        let ledger = match store.load()? {
            Some(state) => {
                info!(
                    initial = %state.initial_balance,
                    peak = %state.peak_balance,
                    day = %state.last_reset_day,
                    "restored risk ledger"
                );
                RiskLedger::restore(
                    state,
                    config.account.settlement_timezone,
                    config.risk.daily_loss_limit_pct,
                    config.risk.total_drawdown_limit_pct,
                )?
            }
            None => RiskLedger::new(
                config.account.initial_balance,
                config.account.settlement_timezone,
                config.risk.daily_loss_limit_pct,
                config.risk.total_drawdown_limit_pct,
            )?,
        };

        Ok(Self {
            ledger,
            store,
            book: PositionBook::new(),
            gate: EntryGate::new(config.entry.to_gate_config()),
            scaling: ScalingController::new(config.scaling.to_controller_config()),
            exits: ExitEngine::new(config.exits.to_engine_config()),
            scheduler: ScanScheduler::new(
                config.scheduler.urgent_secs,
                config.scheduler.monitoring_secs,
                config.scheduler.timeframe_secs,
            ),
            thresholds: config.scheduler.to_thresholds(),
            calendar: config.calendar.to_calendar()?,
            history: TradeHistory::new(config.engine.history_capacity),
            inbox,
            oracle,
            gateway,
            symbols: config.symbols.clone(),
            marks: HashMap::new(),
            paused: false,
            was_halted: false,
            context_trades: config.engine.context_trades,
            candle_label: timeframe_label(config.scheduler.timeframe_secs),
        })
    }

    /// Run one evaluation cycle against a fresh account observation
    pub async fn run_cycle(
        &mut self,
        snapshot: &AccountSnapshot,
        marks: &HashMap<String, Decimal>,
        candles: &HashMap<String, Vec<Candle>>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CycleReport> {
        let cycle_started = Instant::now();
        let mut report = CycleReport::default();

        self.apply_commands(&mut report).await?;
        self.gate.tick(now);

        // Rollover lands before any limit arithmetic sees the new day
        if let Some(rollover) = self.ledger.record_tick(snapshot.balance, snapshot.equity, now) {
            info!(
                previous = %rollover.previous_day,
                new = %rollover.new_day,
                start_balance = %rollover.daily_start_balance,
                "settlement day rolled over"
            );
            telemetry::inc_counter(CounterMetric::DayRollovers);
            self.store.save(&self.ledger.state())?;
            report.rollover = true;
        }

        for (symbol, price) in marks {
            self.marks.insert(symbol.clone(), *price);
            self.book.update_marks(symbol, *price);
        }

        let halt = self.ledger.active_halt();
        match (&halt, self.was_halted) {
            (Some(reason), false) => {
                warn!(
                    reason = reason.code(),
                    daily_pnl = %self.ledger.daily_pnl(),
                    drawdown_pct = %self.ledger.total_drawdown_pct(),
                    "risk halt engaged, new risk blocked"
                );
                telemetry::inc_counter(CounterMetric::LimitHalts);
            }
            (None, true) => info!("risk halt cleared"),
            _ => {}
        }
        self.was_halted = halt.is_some();
        report.halted = halt;

        let market_open = self.calendar.is_open(now);
        let symbols = self.symbols.clone();

        // Consult the decision service for every symbol due a scan
        let mut decisions: HashMap<String, Decision> = HashMap::new();
        for symbol_config in &symbols {
            let positions = self.book.for_symbol(&symbol_config.name);
            let urgency = classify(&positions, snapshot.balance, &self.thresholds);
            if !self
                .scheduler
                .should_scan(&symbol_config.name, urgency, now, market_open)
            {
                continue;
            }
            report.scanned.push(symbol_config.name.clone());

            let context = self.build_context(symbol_config, snapshot, candles, now);
            let decision = match self.oracle.decide(&context).await {
                Ok(decision) => decision,
                Err(error) => {
                    warn!(symbol = %symbol_config.name, %error, "decision unavailable, holding");
                    Decision::hold()
                }
            };
            debug!(
                symbol = %symbol_config.name,
                action = ?decision.action,
                confidence = decision.confidence,
                reason = %decision.reason,
                "decision received"
            );
            decisions.insert(symbol_config.name.clone(), decision);
        }

        // The exit ladder runs for every open position every cycle,
        // fresh decision or not
        for id in self.book.open_ids() {
            let verdict = match self.book.get_mut(id) {
                Some(position) => {
                    let symbol = position.symbol.clone();
                    self.exits
                        .evaluate(position, snapshot.balance, decisions.get(&symbol), now)
                }
                None => continue,
            };
            match verdict {
                ExitDecision::Hold => {}
                ExitDecision::Close { reason } => {
                    if self.close_position(id, reason).await? {
                        report.exits += 1;
                    }
                }
                ExitDecision::PartialClose { fraction, reason } => {
                    if self.partial_close_position(id, fraction, reason).await? {
                        report.exits += 1;
                    }
                }
            }
        }

        // New risk is blocked under a halt or an operator pause;
        // reductions and stop moves stay admitted
        let risk_blocked = report.halted.is_some() || self.paused;

        for symbol_config in &symbols {
            let Some(decision) = decisions.get(&symbol_config.name) else {
                continue;
            };
            match decision.action {
                Action::Buy | Action::Sell => {
                    if !risk_blocked && self.try_entry(symbol_config, decision, now).await? {
                        report.entries += 1;
                    }
                }
                Action::ScaleIn | Action::Dca => {
                    if !risk_blocked && self.try_scale_in(symbol_config, decision).await? {
                        report.scale_ins += 1;
                    }
                }
                Action::ScaleOut => {
                    if self.try_scale_out(symbol_config, decision).await? {
                        report.scale_outs += 1;
                    }
                }
                Action::ModifyStop => {
                    report.stops_moved += self.try_modify_stop(symbol_config, decision).await?;
                }
                // CLOSE was already honoured by the exit ladder
                Action::Close | Action::Hold => {}
            }
        }

        self.publish_gauges();
        telemetry::inc_counter(CounterMetric::Cycles);
        telemetry::record_latency(LatencyMetric::Cycle, cycle_started.elapsed());
        Ok(report)
    }

    /// Persist the current ledger state
    pub fn persist(&self) -> anyhow::Result<()> {
        self.store.save(&self.ledger.state())
    }

    pub fn ledger(&self) -> &RiskLedger {
        &self.ledger
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn history(&self) -> &TradeHistory {
        &self.history
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    async fn apply_commands(&mut self, report: &mut CycleReport) -> anyhow::Result<()> {
        for command in self.inbox.drain() {
            match command {
                Command::Pause => {
                    info!("trading paused by operator");
                    self.paused = true;
                }
                Command::Resume => {
                    info!("trading resumed by operator");
                    self.paused = false;
                }
                Command::CloseSymbol(symbol) => {
                    info!(symbol = %symbol, "operator close on symbol");
                    for id in self.book.ids_for_symbol(&symbol) {
                        if self.close_position(id, ExitReason::Manual).await? {
                            report.exits += 1;
                        }
                    }
                }
                Command::CloseAll => {
                    info!("operator close on whole book");
                    for id in self.book.open_ids() {
                        if self.close_position(id, ExitReason::Manual).await? {
                            report.exits += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn build_context(
        &self,
        symbol_config: &SymbolConfig,
        snapshot: &AccountSnapshot,
        candles: &HashMap<String, Vec<Candle>>,
        now: DateTime<Utc>,
    ) -> DecisionContext {
        let open_positions = self
            .book
            .for_symbol(&symbol_config.name)
            .into_iter()
            .map(|position| PositionSummary::from_position(position, now))
            .collect();

        let mut series = HashMap::new();
        if let Some(bars) = candles.get(&symbol_config.name) {
            series.insert(self.candle_label.clone(), bars.clone());
        }

        DecisionContext {
            symbol: symbol_config.name.clone(),
            account: snapshot.clone(),
            open_positions,
            recent_trades: self.history.summaries(self.context_trades),
            candles: series,
            lot_spec: symbol_config.lots.clone(),
        }
    }

    async fn try_entry(
        &mut self,
        symbol_config: &SymbolConfig,
        decision: &Decision,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let Some(direction) = decision.action.entry_direction() else {
            return Ok(false);
        };
        let Some(requested) = decision.lots else {
            return Ok(false);
        };
        let symbol = symbol_config.name.as_str();

        if let Err(rejection) = self.gate.admit(
            symbol,
            self.book.count_for(symbol),
            self.book.open_count(),
            now,
        ) {
            debug!(symbol, code = rejection.code(), "entry rejected");
            telemetry::inc_counter(CounterMetric::EntriesRejected);
            return Ok(false);
        }

        let lots = symbol_config.lots.normalize(requested);
        // Stops in point distances resolve against the mark the order
        // will trade near
        let (stop, target) = match self.marks.get(symbol) {
            Some(price) => (
                decision
                    .stop
                    .map(|s| s.resolve_stop(*price, direction, symbol_config.point)),
                decision
                    .target
                    .map(|t| t.resolve_target(*price, direction, symbol_config.point)),
            ),
            None => (None, None),
        };

        let request = OrderRequest {
            symbol: symbol.to_string(),
            direction,
            lots,
            stop,
            target,
            comment: decision
                .trade_type
                .clone()
                .unwrap_or_else(|| "entry".to_string()),
        };

        let order_started = Instant::now();
        let result = self.gateway.open(request).await?;
        telemetry::record_latency(LatencyMetric::GatewayOrder, order_started.elapsed());

        match result {
            ExecResult::Filled(fill) => {
                self.gate.record_result(symbol, true, now);
                info!(
                    symbol,
                    direction = ?direction,
                    lots = %fill.lots,
                    price = %fill.price,
                    confidence = decision.confidence,
                    "entry filled"
                );
                self.book.insert(Position {
                    id: fill.position_id,
                    symbol: fill.symbol,
                    direction: fill.direction,
                    lots: fill.lots,
                    entry_price: fill.price,
                    opened_at: fill.executed_at,
                    stop,
                    target,
                    contract_value: symbol_config.contract_value,
                    floating_pnl: dec!(0),
                    peak_profit: dec!(0),
                    partial_exit_taken: false,
                    entry_confidence: decision.confidence,
                });
                Ok(true)
            }
            ExecResult::Rejected(code) => {
                self.gate.record_result(symbol, false, now);
                warn!(symbol, code = code.code(), "entry rejected by venue");
                telemetry::inc_counter(CounterMetric::OrdersRejected);
                Ok(false)
            }
        }
    }

    async fn try_scale_in(
        &mut self,
        symbol_config: &SymbolConfig,
        decision: &Decision,
    ) -> anyhow::Result<bool> {
        let symbol = symbol_config.name.as_str();

        let (add_lots, direction) = {
            let positions = self.book.for_symbol(symbol);
            let lots =
                match self
                    .scaling
                    .evaluate_scale_in(decision, &positions, &symbol_config.lots)
                {
                    Ok(lots) if lots > dec!(0) => lots,
                    Ok(_) => return Ok(false),
                    Err(rejection) => {
                        debug!(symbol, code = rejection.code(), "scale-in rejected");
                        telemetry::inc_counter(CounterMetric::ScalesRejected);
                        return Ok(false);
                    }
                };
            let direction = match positions.iter().max_by_key(|p| p.opened_at) {
                Some(position) => position.direction,
                None => return Ok(false),
            };
            (lots, direction)
        };

        let (stop, target) = match self.marks.get(symbol) {
            Some(price) => (
                decision
                    .stop
                    .map(|s| s.resolve_stop(*price, direction, symbol_config.point)),
                decision
                    .target
                    .map(|t| t.resolve_target(*price, direction, symbol_config.point)),
            ),
            None => (None, None),
        };

        let request = OrderRequest {
            symbol: symbol.to_string(),
            direction,
            lots: add_lots,
            stop,
            target,
            comment: "scale-in".to_string(),
        };

        let order_started = Instant::now();
        let result = self.gateway.open(request).await?;
        telemetry::record_latency(LatencyMetric::GatewayOrder, order_started.elapsed());

        match result {
            ExecResult::Filled(fill) => {
                info!(
                    symbol,
                    lots = %fill.lots,
                    price = %fill.price,
                    confidence = decision.confidence,
                    "scale-in filled"
                );
                self.book.insert(Position {
                    id: fill.position_id,
                    symbol: fill.symbol,
                    direction: fill.direction,
                    lots: fill.lots,
                    entry_price: fill.price,
                    opened_at: fill.executed_at,
                    stop,
                    target,
                    contract_value: symbol_config.contract_value,
                    floating_pnl: dec!(0),
                    peak_profit: dec!(0),
                    partial_exit_taken: false,
                    entry_confidence: decision.confidence,
                });
                Ok(true)
            }
            ExecResult::Rejected(code) => {
                warn!(symbol, code = code.code(), "scale-in rejected by venue");
                telemetry::inc_counter(CounterMetric::OrdersRejected);
                Ok(false)
            }
        }
    }

    async fn try_scale_out(
        &mut self,
        symbol_config: &SymbolConfig,
        decision: &Decision,
    ) -> anyhow::Result<bool> {
        let symbol = symbol_config.name.as_str();

        // Reductions come off the most recent addition first
        let (id, plan) = {
            let Some(position) = self
                .book
                .for_symbol(symbol)
                .into_iter()
                .max_by_key(|p| p.opened_at)
            else {
                return Ok(false);
            };
            (
                position.id,
                self.scaling
                    .evaluate_scale_out(decision, position, &symbol_config.lots),
            )
        };

        match plan {
            ScaleOutPlan::Skip => Ok(false),
            ScaleOutPlan::FullClose => self.close_position(id, ExitReason::OracleScaleOut).await,
            ScaleOutPlan::Reduce(lots) => {
                let result = self.gateway.partial_close(id, lots).await?;
                match result {
                    ExecResult::Filled(fill) => {
                        if let Some(realized) = self.book.reduce(id, fill.lots, fill.price) {
                            self.ledger.record_realized(realized);
                            info!(
                                symbol,
                                lots = %fill.lots,
                                pnl = %realized,
                                "scaled out"
                            );
                            self.store.save(&self.ledger.state())?;
                        }
                        Ok(true)
                    }
                    ExecResult::Rejected(code) => {
                        warn!(symbol, code = code.code(), "scale-out rejected, book unchanged");
                        telemetry::inc_counter(CounterMetric::OrdersRejected);
                        Ok(false)
                    }
                }
            }
        }
    }

    async fn try_modify_stop(
        &mut self,
        symbol_config: &SymbolConfig,
        decision: &Decision,
    ) -> anyhow::Result<usize> {
        let Some(spec) = decision.stop else {
            return Ok(0);
        };
        let symbol = symbol_config.name.as_str();

        let targets: Vec<(Uuid, Decimal)> = self
            .book
            .for_symbol(symbol)
            .into_iter()
            .map(|position| {
                (
                    position.id,
                    spec.resolve_stop(position.entry_price, position.direction, symbol_config.point),
                )
            })
            .collect();

        let mut moved = 0;
        for (id, stop) in targets {
            match self.gateway.modify_stop(id, stop).await? {
                ExecResult::Filled(_) => {
                    self.book.set_stop(id, stop);
                    info!(symbol, position = %id, stop = %stop, "stop moved");
                    moved += 1;
                }
                ExecResult::Rejected(code) => {
                    warn!(symbol, position = %id, code = code.code(), "stop move rejected");
                    telemetry::inc_counter(CounterMetric::OrdersRejected);
                }
            }
        }
        Ok(moved)
    }

    /// Close the whole position; book and ledger change only on a fill
    async fn close_position(&mut self, id: Uuid, reason: ExitReason) -> anyhow::Result<bool> {
        let order_started = Instant::now();
        let result = self.gateway.close(id).await?;
        telemetry::record_latency(LatencyMetric::GatewayOrder, order_started.elapsed());

        match result {
            ExecResult::Filled(fill) => {
                if let Some(closed) = self.book.close(id, fill.price, fill.executed_at, reason) {
                    self.ledger.record_realized(closed.realized_pnl);
                    info!(
                        symbol = %closed.position.symbol,
                        reason = reason.code(),
                        pnl = %closed.realized_pnl,
                        held_secs = (closed.closed_at - closed.position.opened_at).num_seconds(),
                        "position closed"
                    );
                    telemetry::inc_counter(CounterMetric::ExitsFired);
                    self.history.record(closed);
                    self.store.save(&self.ledger.state())?;
                }
                Ok(true)
            }
            ExecResult::Rejected(code) => {
                warn!(position = %id, code = code.code(), "close rejected, book unchanged");
                telemetry::inc_counter(CounterMetric::OrdersRejected);
                Ok(false)
            }
        }
    }

    /// Close part of a position. A remainder that would fall under the
    /// broker minimum collapses into a full close instead.
    async fn partial_close_position(
        &mut self,
        id: Uuid,
        fraction: Decimal,
        reason: ExitReason,
    ) -> anyhow::Result<bool> {
        let (open_lots, lot_spec) = match self.book.get(id) {
            Some(position) => (position.lots, self.lot_spec_for(&position.symbol)),
            None => return Ok(false),
        };

        let close_lots = lot_spec.floor_to_step(open_lots * fraction);
        if close_lots <= dec!(0) || open_lots - close_lots < lot_spec.min_lot {
            return self.close_position(id, reason).await;
        }

        let result = self.gateway.partial_close(id, close_lots).await?;
        match result {
            ExecResult::Filled(fill) => {
                if let Some(realized) = self.book.reduce(id, fill.lots, fill.price) {
                    self.ledger.record_realized(realized);
                    // The milestone is burned only by a confirmed fill
                    if reason == ExitReason::TrailingPartial {
                        self.book.set_partial_exit_taken(id);
                    }
                    info!(
                        position = %id,
                        lots = %fill.lots,
                        pnl = %realized,
                        reason = reason.code(),
                        "position reduced"
                    );
                    telemetry::inc_counter(CounterMetric::ExitsFired);
                    self.store.save(&self.ledger.state())?;
                }
                Ok(true)
            }
            ExecResult::Rejected(code) => {
                warn!(position = %id, code = code.code(), "partial close rejected, book unchanged");
                telemetry::inc_counter(CounterMetric::OrdersRejected);
                Ok(false)
            }
        }
    }

    fn lot_spec_for(&self, symbol: &str) -> LotSpec {
        self.symbols
            .iter()
            .find(|s| s.name == symbol)
            .map(|s| s.lots.clone())
            .unwrap_or_default()
    }

    fn publish_gauges(&self) {
        telemetry::set_gauge(GaugeMetric::Balance, gauge_value(self.ledger.latest_balance()));
        telemetry::set_gauge(GaugeMetric::Equity, gauge_value(self.ledger.latest_equity()));
        telemetry::set_gauge(GaugeMetric::DailyPnl, gauge_value(self.ledger.daily_pnl()));
        telemetry::set_gauge(
            GaugeMetric::DrawdownPct,
            gauge_value(self.ledger.total_drawdown_pct()),
        );
        telemetry::set_gauge(
            GaugeMetric::PeakBalance,
            gauge_value(self.ledger.peak_balance()),
        );
        telemetry::set_gauge(GaugeMetric::OpenPositions, self.book.open_count() as f64);
    }
}

fn gauge_value(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Timeframe label for the candle series sent to the decision service
fn timeframe_label(secs: u64) -> String {
    match secs {
        60 => "M1".to_string(),
        300 => "M5".to_string(),
        900 => "M15".to_string(),
        1800 => "M30".to_string(),
        3600 => "H1".to_string(),
        14400 => "H4".to_string(),
        86400 => "D1".to_string(),
        other => format!("S{other}"),
    }
}

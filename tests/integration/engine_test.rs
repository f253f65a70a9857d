//! Engine lifecycle scenarios driven through full evaluation cycles

use crate::support::{snapshot, test_config, utc, StubOracle};
use chrono::{DateTime, Duration, Utc};
use prop_sentry::commands::{command_channel, Command, CommandEnvelope, CommandSender};
use prop_sentry::engine::{CycleReport, Engine, ReplayFeed};
use prop_sentry::gateway::SimGateway;
use prop_sentry::ledger::HaltReason;
use prop_sentry::position::ExitReason;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

struct Rig {
    engine: Engine,
    gateway: Arc<SimGateway>,
    oracle: Arc<StubOracle>,
    commands: CommandSender,
    _dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let gateway = Arc::new(SimGateway::new());
    let oracle = Arc::new(StubOracle::new());
    let (commands, inbox) = command_channel(8);
    let engine = Engine::new(&config, oracle.clone(), gateway.clone(), inbox).unwrap();
    Rig {
        engine,
        gateway,
        oracle,
        commands,
        _dir: dir,
    }
}

/// One cycle against a single EURUSD mark, with the sim clock pinned to
/// the cycle time so position ages follow the scenario.
async fn eur_cycle(
    rig: &mut Rig,
    balance: Decimal,
    equity: Decimal,
    mark: Decimal,
    at: DateTime<Utc>,
) -> CycleReport {
    rig.gateway.set_clock(at).await;
    rig.gateway.set_mark("EURUSD", mark).await;
    let marks = HashMap::from([("EURUSD".to_string(), mark)]);
    rig.engine
        .run_cycle(&snapshot(balance, equity, at), &marks, &HashMap::new(), at)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_trailing_partial_then_full_close() {
    let mut rig = rig();
    let t0 = utc(2026, 3, 4, 12, 0);

    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
        .await;
    let report = eur_cycle(&mut rig, dec!(100000), dec!(100000), dec!(1.1000), t0).await;
    assert_eq!(report.entries, 1);

    // Profit peaks at 1000
    eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(101000),
        dec!(1.1100),
        t0 + Duration::minutes(15),
    )
    .await;

    // 20% giveback: half the position is banked, once
    let report = eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(100800),
        dec!(1.1080),
        t0 + Duration::minutes(30),
    )
    .await;
    assert_eq!(report.exits, 1);
    let open = rig.engine.book().for_symbol("EURUSD");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].lots, dec!(0.5));
    assert!(open[0].partial_exit_taken);
    assert_eq!(rig.engine.ledger().daily_realized(), dec!(400));
    assert!(rig.engine.book().closed().is_empty());

    // 80% giveback on the remainder closes it outright
    let report = eur_cycle(
        &mut rig,
        dec!(100400),
        dec!(100500),
        dec!(1.1020),
        t0 + Duration::minutes(45),
    )
    .await;
    assert_eq!(report.exits, 1);
    assert_eq!(rig.engine.book().open_count(), 0);
    let closed = rig.engine.book().closed();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, ExitReason::TrailingFull);
    assert_eq!(closed[0].realized_pnl, dec!(100));
    assert_eq!(rig.engine.ledger().daily_realized(), dec!(500));
}

#[tokio::test]
async fn test_scale_in_adds_then_scale_out_trims_newest() {
    let mut rig = rig();
    let t0 = utc(2026, 3, 4, 12, 0);

    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
        .await;
    eur_cycle(&mut rig, dec!(100000), dec!(100000), dec!(1.1000), t0).await;

    // In profit and 6 confidence points over the last entry: admitted
    rig.oracle
        .push(
            "EURUSD",
            r#"{"action":"SCALE_IN","confidence":76,"add_lots":0.5}"#,
        )
        .await;
    let report = eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(100500),
        dec!(1.1050),
        t0 + Duration::minutes(15),
    )
    .await;
    assert_eq!(report.scale_ins, 1);
    assert_eq!(rig.engine.book().open_count(), 2);

    // The reduction lands on the newest addition and covers it fully
    rig.oracle
        .push(
            "EURUSD",
            r#"{"action":"SCALE_OUT","confidence":55,"reduce_lots":2}"#,
        )
        .await;
    let report = eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(100950),
        dec!(1.1080),
        t0 + Duration::minutes(30),
    )
    .await;
    assert_eq!(report.scale_outs, 1);

    let open = rig.engine.book().for_symbol("EURUSD");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].entry_price, dec!(1.1000));
    let closed = rig.engine.book().closed();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].position.entry_price, dec!(1.1050));
    assert_eq!(closed[0].position.entry_confidence, 76);
    assert_eq!(closed[0].reason, ExitReason::OracleScaleOut);
    assert_eq!(closed[0].realized_pnl, dec!(150));
    assert_eq!(rig.engine.ledger().daily_realized(), dec!(150));
}

#[tokio::test]
async fn test_daily_halt_blocks_entries_until_settlement_rollover() {
    let mut rig = rig();
    let t0 = utc(2026, 3, 4, 12, 0);

    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
        .await;
    eur_cycle(&mut rig, dec!(100000), dec!(100000), dec!(1.1000), t0).await;

    // A 6% equity drop crosses the 5% daily limit. The hard stop cuts
    // the bleeding position; the fresh BUY stays blocked.
    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":90,"lots":1}"#)
        .await;
    let report = eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(94000),
        dec!(1.0400),
        t0 + Duration::minutes(15),
    )
    .await;
    assert!(matches!(report.halted, Some(HaltReason::DailyLossLimit(_))));
    assert_eq!(report.entries, 0);
    assert_eq!(report.exits, 1);
    assert_eq!(rig.engine.book().closed()[0].reason, ExitReason::HardStop);
    assert_eq!(rig.engine.ledger().daily_realized(), dec!(-6000));

    // Next settlement day: fresh anchor, drawdown still inside 10%
    let day2 = utc(2026, 3, 5, 0, 15);
    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":72,"lots":0.5}"#)
        .await;
    let report = eur_cycle(&mut rig, dec!(94000), dec!(94000), dec!(1.0400), day2).await;
    assert!(report.rollover);
    assert!(report.halted.is_none());
    assert_eq!(report.entries, 1);
    assert_eq!(rig.engine.book().open_count(), 1);
    assert_eq!(rig.engine.ledger().daily_pnl(), dec!(0));
}

#[tokio::test]
async fn test_close_symbol_command_spares_other_symbols() {
    let mut rig = rig();
    let t0 = utc(2026, 3, 4, 12, 0);

    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
        .await;
    rig.oracle
        .push("XAUUSD", r#"{"action":"SELL","confidence":68,"lots":0.5}"#)
        .await;
    rig.gateway.set_clock(t0).await;
    rig.gateway.set_mark("EURUSD", dec!(1.1000)).await;
    rig.gateway.set_mark("XAUUSD", dec!(2400)).await;
    let marks = HashMap::from([
        ("EURUSD".to_string(), dec!(1.1000)),
        ("XAUUSD".to_string(), dec!(2400)),
    ]);
    let report = rig
        .engine
        .run_cycle(
            &snapshot(dec!(100000), dec!(100000), t0),
            &marks,
            &HashMap::new(),
            t0,
        )
        .await
        .unwrap();
    assert_eq!(report.entries, 2);

    rig.commands
        .send(CommandEnvelope::new(Command::CloseSymbol(
            "EURUSD".to_string(),
        )));
    let at = t0 + Duration::minutes(15);
    rig.gateway.set_clock(at).await;
    let report = rig
        .engine
        .run_cycle(
            &snapshot(dec!(100000), dec!(100000), at),
            &marks,
            &HashMap::new(),
            at,
        )
        .await
        .unwrap();

    assert_eq!(report.exits, 1);
    assert!(rig.engine.book().for_symbol("EURUSD").is_empty());
    assert_eq!(rig.engine.book().for_symbol("XAUUSD").len(), 1);
    let closed = rig.engine.book().closed();
    assert_eq!(closed[0].position.symbol, "EURUSD");
    assert_eq!(closed[0].reason, ExitReason::Manual);
}

#[tokio::test]
async fn test_unproductive_position_cut_after_stale_window() {
    let mut rig = rig();
    let t0 = utc(2026, 3, 4, 12, 0);

    rig.oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
        .await;
    eur_cycle(&mut rig, dec!(100000), dec!(100000), dec!(1.1000), t0).await;

    // Five hours on, the trade never went anywhere
    let report = eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(99950),
        dec!(1.0995),
        t0 + Duration::hours(5),
    )
    .await;
    assert_eq!(report.exits, 1);
    assert_eq!(rig.engine.book().open_count(), 0);
    let closed = rig.engine.book().closed();
    assert_eq!(closed[0].reason, ExitReason::StaleUnproductive);
    assert_eq!(closed[0].realized_pnl, dec!(-50));
}

#[tokio::test]
async fn test_stop_moves_stay_admitted_while_paused() {
    let mut rig = rig();
    let t0 = utc(2026, 3, 4, 12, 0);

    rig.oracle
        .push(
            "EURUSD",
            r#"{"action":"BUY","confidence":70,"lots":1,"stop_points":200}"#,
        )
        .await;
    eur_cycle(&mut rig, dec!(100000), dec!(100000), dec!(1.1000), t0).await;
    assert_eq!(
        rig.engine.book().for_symbol("EURUSD")[0].stop,
        Some(dec!(1.0800))
    );

    rig.commands.send(CommandEnvelope::new(Command::Pause));
    rig.oracle
        .push(
            "EURUSD",
            r#"{"action":"MODIFY_STOP","confidence":50,"stop_price":1.0950}"#,
        )
        .await;
    let report = eur_cycle(
        &mut rig,
        dec!(100000),
        dec!(100000),
        dec!(1.1000),
        t0 + Duration::minutes(15),
    )
    .await;

    assert!(rig.engine.is_paused());
    assert_eq!(report.stops_moved, 1);
    assert_eq!(
        rig.engine.book().for_symbol("EURUSD")[0].stop,
        Some(dec!(1.0950))
    );
}

#[tokio::test]
async fn test_replay_feed_drives_full_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let gateway = Arc::new(SimGateway::new());
    let oracle = Arc::new(StubOracle::new());
    let (_commands, inbox) = command_channel(8);
    let mut engine = Engine::new(&config, oracle.clone(), gateway.clone(), inbox).unwrap();

    oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
        .await;

    let mut capture = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        capture,
        r#"{{"at":"2026-03-04T12:00:00Z","balance":100000,"equity":100000,"marks":{{"EURUSD":1.1000}}}}"#
    )
    .unwrap();
    writeln!(
        capture,
        r#"{{"at":"2026-03-04T12:15:00Z","balance":100000,"equity":100500,"marks":{{"EURUSD":1.1050}}}}"#
    )
    .unwrap();
    writeln!(
        capture,
        r#"{{"at":"2026-03-04T12:30:00Z","balance":100000,"equity":100250,"marks":{{"EURUSD":1.1025}}}}"#
    )
    .unwrap();
    capture.flush().unwrap();

    let mut cycles = 0;
    for event in ReplayFeed::open(capture.path()).unwrap() {
        let event = event.unwrap();
        gateway.set_clock(event.at).await;
        for (symbol, price) in &event.marks {
            gateway.set_mark(symbol, *price).await;
        }
        let account = snapshot(event.balance, event.equity, event.at);
        engine
            .run_cycle(&account, &event.marks, &event.candles, event.at)
            .await
            .unwrap();
        cycles += 1;
    }

    // Entry on the first event, peak on the second, a 50% giveback on
    // the third trips the trailing full close
    assert_eq!(cycles, 3);
    assert_eq!(engine.book().open_count(), 0);
    let closed = engine.book().closed();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, ExitReason::TrailingFull);
    assert_eq!(engine.ledger().daily_realized(), dec!(250));
    assert_eq!(engine.ledger().peak_balance(), dec!(100500));
}

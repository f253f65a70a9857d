//! Limits surviving a process restart

use crate::support::{snapshot, test_config, utc, StubOracle};
use chrono::Duration;
use prop_sentry::commands::{command_channel, Command, CommandEnvelope};
use prop_sentry::engine::Engine;
use prop_sentry::gateway::SimGateway;
use prop_sentry::ledger::HaltReason;
use prop_sentry::position::ExitReason;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_realized_losses_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let t0 = utc(2026, 3, 4, 12, 0);
    let marks = HashMap::from([("EURUSD".to_string(), dec!(1.1000))]);

    {
        let gateway = Arc::new(SimGateway::new());
        let oracle = Arc::new(StubOracle::new());
        let (commands, inbox) = command_channel(8);
        let mut engine = Engine::new(&config, oracle.clone(), gateway.clone(), inbox).unwrap();

        gateway.set_clock(t0).await;
        gateway.set_mark("EURUSD", dec!(1.1000)).await;
        oracle
            .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
            .await;
        engine
            .run_cycle(
                &snapshot(dec!(100000), dec!(100000), t0),
                &marks,
                &HashMap::new(),
                t0,
            )
            .await
            .unwrap();

        // Operator flattens 50 points lower
        let at = t0 + Duration::minutes(5);
        gateway.set_clock(at).await;
        gateway.set_mark("EURUSD", dec!(1.0950)).await;
        commands.send(CommandEnvelope::new(Command::CloseAll));
        let down = HashMap::from([("EURUSD".to_string(), dec!(1.0950))]);
        engine
            .run_cycle(
                &snapshot(dec!(100000), dec!(99500), at),
                &down,
                &HashMap::new(),
                at,
            )
            .await
            .unwrap();

        assert_eq!(engine.ledger().daily_realized(), dec!(-500));
        assert_eq!(engine.book().closed()[0].reason, ExitReason::Manual);
    }

    // Fresh process, same configuration: the day picks up where it
    // left off instead of resetting the anchor
    let gateway = Arc::new(SimGateway::new());
    let oracle = Arc::new(StubOracle::new());
    let (_commands, inbox) = command_channel(8);
    let mut engine = Engine::new(&config, oracle, gateway, inbox).unwrap();

    assert_eq!(engine.ledger().daily_realized(), dec!(-500));
    assert_eq!(engine.ledger().initial_balance(), dec!(100000));
    assert_eq!(engine.ledger().daily_start_balance(), dec!(100000));
    assert_eq!(engine.ledger().peak_balance(), dec!(100000));

    // Later the same settlement day: no rollover
    let later = utc(2026, 3, 4, 16, 0);
    let report = engine
        .run_cycle(
            &snapshot(dec!(99500), dec!(99500), later),
            &HashMap::new(),
            &HashMap::new(),
            later,
        )
        .await
        .unwrap();
    assert!(!report.rollover);
    assert_eq!(engine.ledger().daily_pnl(), dec!(-500));
    assert_eq!(engine.ledger().daily_realized(), dec!(-500));
}

#[tokio::test]
async fn test_daily_halt_reasserts_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let t0 = utc(2026, 3, 4, 12, 0);

    {
        let gateway = Arc::new(SimGateway::new());
        let oracle = Arc::new(StubOracle::new());
        let (_commands, inbox) = command_channel(8);
        let mut engine = Engine::new(&config, oracle.clone(), gateway.clone(), inbox).unwrap();

        gateway.set_clock(t0).await;
        gateway.set_mark("EURUSD", dec!(1.1000)).await;
        oracle
            .push("EURUSD", r#"{"action":"BUY","confidence":70,"lots":1}"#)
            .await;
        let marks = HashMap::from([("EURUSD".to_string(), dec!(1.1000))]);
        engine
            .run_cycle(
                &snapshot(dec!(100000), dec!(100000), t0),
                &marks,
                &HashMap::new(),
                t0,
            )
            .await
            .unwrap();

        // Hard stop realizes -6000; the ledger snapshot lands on disk
        // with the close
        let at = t0 + Duration::minutes(15);
        gateway.set_clock(at).await;
        gateway.set_mark("EURUSD", dec!(1.0400)).await;
        let down = HashMap::from([("EURUSD".to_string(), dec!(1.0400))]);
        engine
            .run_cycle(
                &snapshot(dec!(100000), dec!(94000), at),
                &down,
                &HashMap::new(),
                at,
            )
            .await
            .unwrap();
        assert_eq!(engine.ledger().daily_realized(), dec!(-6000));
    }

    // Restart on the same settlement day: the first tick re-derives the
    // breach from the persisted anchor and blocks the scripted entry
    let gateway = Arc::new(SimGateway::new());
    let oracle = Arc::new(StubOracle::new());
    let (_commands, inbox) = command_channel(8);
    let mut engine = Engine::new(&config, oracle.clone(), gateway.clone(), inbox).unwrap();

    let at = t0 + Duration::minutes(30);
    gateway.set_clock(at).await;
    gateway.set_mark("EURUSD", dec!(1.0400)).await;
    oracle
        .push("EURUSD", r#"{"action":"BUY","confidence":95,"lots":1}"#)
        .await;
    let marks = HashMap::from([("EURUSD".to_string(), dec!(1.0400))]);
    let report = engine
        .run_cycle(
            &snapshot(dec!(94000), dec!(94000), at),
            &marks,
            &HashMap::new(),
            at,
        )
        .await
        .unwrap();

    assert!(matches!(report.halted, Some(HaltReason::DailyLossLimit(_))));
    assert_eq!(report.entries, 0);
    assert_eq!(engine.book().open_count(), 0);
}

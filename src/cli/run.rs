//! Run command implementation

use crate::account::AccountSnapshot;
use crate::commands::command_channel;
use crate::config::Config;
use crate::engine::{Engine, ReplayFeed};
use crate::gateway::SimGateway;
use crate::oracle::OracleClient;
use clap::Args;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Replay a captured JSONL account feed instead of a live venue
    #[arg(long)]
    pub replay: Option<PathBuf>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        match &self.replay {
            Some(path) => run_replay(config, path).await,
            None => anyhow::bail!("no live venue adapter is wired yet; pass --replay <capture>"),
        }
    }
}

async fn run_replay(config: &Config, path: &Path) -> anyhow::Result<()> {
    info!(path = %path.display(), "starting replay");

    let gateway = Arc::new(SimGateway::new());
    let oracle = Arc::new(OracleClient::new(config.oracle.to_client_config())?);
    let (_commands, inbox) = command_channel(config.engine.inbox_capacity);
    let mut engine = Engine::new(config, oracle, gateway.clone(), inbox)?;

    let mut cycles = 0usize;
    let mut halted_cycles = 0usize;
    for event in ReplayFeed::open(path)? {
        let event = event?;

        // The sim venue fills at the replayed marks and timestamps
        gateway.set_clock(event.at).await;
        for (symbol, price) in &event.marks {
            gateway.set_mark(symbol, *price).await;
        }

        let snapshot = AccountSnapshot {
            balance: event.balance,
            equity: event.equity,
            margin_used: event.margin_used,
            currency: config.account.currency.clone(),
            taken_at: event.at,
        };

        let report = engine
            .run_cycle(&snapshot, &event.marks, &event.candles, event.at)
            .await?;
        cycles += 1;
        if report.halted.is_some() {
            halted_cycles += 1;
        }
    }

    engine.persist()?;
    if halted_cycles > 0 {
        warn!(halted_cycles, "replay spent cycles under a risk halt");
    }
    print_summary(&engine, cycles);
    Ok(())
}

fn print_summary(engine: &Engine, cycles: usize) {
    let ledger = engine.ledger();
    let book = engine.book();

    println!("Replay complete: {cycles} cycles");
    println!("  Balance:        {}", ledger.latest_balance());
    println!("  Peak balance:   {}", ledger.peak_balance());
    println!("  Daily P&L:      {}", ledger.daily_pnl());
    println!("  Open positions: {}", book.open_count());
    println!(
        "  Closed trades:  {} (realized {})",
        book.closed().len(),
        book.realized_pnl()
    );
    match engine.history().win_rate() {
        Some(rate) => println!("  Win rate:       {}", rate * dec!(100)),
        None => println!("  Win rate:       n/a"),
    }
}

//! Status command implementation

use crate::config::Config;
use crate::ledger::LedgerStore;

/// Print the persisted risk ledger, if one exists
pub fn print_status(config: &Config) -> anyhow::Result<()> {
    let store = LedgerStore::new(&config.risk.ledger_path);
    match store.load()? {
        Some(state) => {
            println!("prop-sentry ledger");
            println!("  Initial balance:   {}", state.initial_balance);
            println!(
                "  Day start balance: {} ({})",
                state.daily_start_balance, state.last_reset_day
            );
            println!("  Peak balance:      {}", state.peak_balance);
            println!("  Daily realized:    {}", state.daily_realized_pnl);
        }
        None => {
            println!(
                "No ledger found at {}; the engine has not run yet",
                config.risk.ledger_path.display()
            );
        }
    }
    Ok(())
}

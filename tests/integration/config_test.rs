//! The shipped example configuration stays loadable

use prop_sentry::config::Config;
use rust_decimal_macros::dec;

#[test]
fn test_example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.account.initial_balance, dec!(200000));
    assert_eq!(config.risk.daily_loss_limit_pct, dec!(0.05));
    assert_eq!(config.risk.total_drawdown_limit_pct, dec!(0.10));

    assert_eq!(config.symbols.len(), 2);
    assert_eq!(config.symbols[0].name, "EURUSD");
    assert_eq!(config.symbols[1].lots.max_lot, dec!(50));

    config.calendar.to_calendar().unwrap();
    assert_eq!(config.oracle.to_client_config().timeout.as_secs(), 8);
}

#[test]
fn test_symbol_lookup() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert!(config.symbol("XAUUSD").is_some());
    assert!(config.symbol("GBPJPY").is_none());
}

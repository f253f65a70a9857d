use clap::Parser;
use prop_sentry::cli::{Cli, Commands};
use prop_sentry::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    prop_sentry::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting governed execution");
            args.execute(&config).await?;
        }
        Commands::Status => {
            prop_sentry::cli::status::print_status(&config)?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Account: {} {} (day rolls at midnight {})",
                config.account.initial_balance,
                config.account.currency,
                config.account.settlement_timezone
            );
            println!(
                "  Limits: daily {}%, total drawdown {}%",
                config.risk.daily_loss_limit_pct * rust_decimal_macros::dec!(100),
                config.risk.total_drawdown_limit_pct * rust_decimal_macros::dec!(100)
            );
            println!(
                "  Oracle: {} ({}s timeout)",
                config.oracle.endpoint, config.oracle.timeout_secs
            );
            println!(
                "  Symbols: {}",
                config
                    .symbols
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(())
}

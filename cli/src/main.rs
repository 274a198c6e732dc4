//! collateral-sim entry point.
//!
//! Thin scenario runner around the simulator library: loads a scenario
//! file, prices it with the table oracle (or the fixed offline fixture),
//! drives every transaction to completion, and exports one pretty-printed
//! JSON log per transaction. Transactions are independent; one failing run
//! never stops the others.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use collateral_simulator_core_rs::{
    FixedPriceOracle, LendingTransaction, PriceOracle, ScenarioFile, TablePriceOracle,
    TransactionPhase,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "collateral-sim")]
#[command(about = "Daily collateral rebalancing simulator", long_about = None)]
struct Cli {
    /// Scenario file (JSON): transaction configs plus market data
    scenario: PathBuf,

    /// Directory for the per-transaction log exports
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Ignore the scenario's market data and price everything with the
    /// fixed offline fixture (securities 500.0, FX 150.0)
    #[arg(long, default_value_t = false)]
    fixed_prices: bool,

    /// Log at debug level (RUST_LOG overrides this)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let raw = fs::read_to_string(&cli.scenario)
        .with_context(|| format!("read scenario file {}", cli.scenario.display()))?;
    let ScenarioFile {
        transactions,
        market_data,
    } = serde_json::from_str(&raw)
        .with_context(|| format!("parse scenario file {}", cli.scenario.display()))?;

    if transactions.is_empty() {
        anyhow::bail!("scenario declares no transactions");
    }

    let oracle: Arc<dyn PriceOracle> = if cli.fixed_prices {
        info!("pricing with the fixed offline fixture");
        Arc::new(FixedPriceOracle::default())
    } else {
        info!(
            prices = market_data.prices.len(),
            fx_rates = market_data.fx_rates.len(),
            "pricing with the scenario market data"
        );
        Arc::new(TablePriceOracle::new(market_data))
    };

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("create output directory {}", cli.output.display()))?;

    let total = transactions.len();
    let mut failed = 0usize;

    for (index, config) in transactions.into_iter().enumerate() {
        info!(
            index,
            borrower = %config.borrower,
            lender = %config.lender,
            strategy = ?config.strategy,
            "starting transaction"
        );

        let mut transaction = match LendingTransaction::new(config, Arc::clone(&oracle)) {
            Ok(transaction) => transaction,
            Err(err) => {
                // Nothing was created, so there is no log to export.
                error!(index, error = %err, "transaction rejected at construction");
                failed += 1;
                continue;
            }
        };

        if let Err(err) = transaction.run() {
            error!(index, error = %err, "transaction failed mid-run");
            failed += 1;
        }

        // Export whatever was produced, completed or partial.
        let path = cli.output.join(format!("transaction-{index:02}.json"));
        let pretty = serde_json::to_string_pretty(transaction.log())
            .context("serialize simulation log")?;
        fs::write(&path, pretty).with_context(|| format!("write {}", path.display()))?;

        let fingerprint = transaction
            .log()
            .fingerprint()
            .context("fingerprint simulation log")?;
        println!(
            "transaction={index:02} id={} phase={} days={} fingerprint={} log={}",
            transaction.id(),
            describe_phase(transaction.phase()),
            transaction.log().len(),
            fingerprint,
            path.display(),
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} transactions failed");
    }
    info!(total, "all transactions completed");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn describe_phase(phase: TransactionPhase) -> String {
    match phase {
        TransactionPhase::Created => "created".to_string(),
        TransactionPhase::Active => "active".to_string(),
        TransactionPhase::Completed => "completed".to_string(),
        TransactionPhase::Failed { reason } => format!("failed({reason:?})"),
    }
}

//! Agora exchange binary.
//!
//! Loads the product list, launches the traders and runs the market
//! until every trader has disconnected.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora_exchange::bootstrap::{load_products, spawn_traders, wait_for_traders};
use agora_exchange::{Cli, Exchange, TraderRegistry};
use agora_net::Gateway;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("Exchange terminated: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    info!("Starting");

    let products = load_products(&cli.products_file)
        .with_context(|| format!("loading products from {}", cli.products_file.display()))?;

    let mut gateway = Gateway::new().context("creating trader gateway")?;
    let mut traders = TraderRegistry::new();
    let processes = spawn_traders(&cli.traders, &mut gateway, &mut traders)?;

    let mut exchange = Exchange::new(gateway, products, traders, cli.fee_rate)?;
    exchange.open_market()?;
    let outcome = exchange.run();

    // Close our pipe ends before reaping.
    drop(exchange);
    wait_for_traders(processes);
    let settlement = outcome?;
    info!(total_fees = settlement.total_fees, "Exchange shut down");
    Ok(())
}

//! BTC Alerts - scores market data and pushes filtered alerts
//!
//! 1. Loads layered settings (defaults, optional file, `ALERTS__*` env)
//! 2. Collects prices, candles and context from public APIs
//! 3. Scores BTC and the SPX proxy on 5m/15m/1h
//! 4. Sends alerts that pass the lifecycle gate to Telegram or stdout

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use btc_alerts::collectors::{BudgetManager, Endpoints, HttpFetcher};
use btc_alerts::notifier::notifier_from_env;
use btc_alerts::{AlertEngine, AlertGate, AlertJournal, AlertRunner, JsonStateFile, Settings};

#[derive(Debug, Parser)]
#[command(name = "btc-alerts", about = "BTC and SPX alert engine")]
struct Cli {
    /// Run a single decision cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();

    let config_path = std::env::var("ALERTS_CONFIG").ok().map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref()).context("Invalid configuration")?;
    info!("Starting BTC alerts (once: {})", cli.once);

    let runtime = settings.runtime.clone();
    let budget = Arc::new(BudgetManager::new(
        settings.budgets.clone(),
        Some(PathBuf::from(&runtime.budget_path)),
    ));
    let http = HttpFetcher::new(settings.http_retry, budget)?;
    let notifier = notifier_from_env()?;
    let gate = AlertGate::open(JsonStateFile::new(&runtime.state_path), settings.cooldowns).await;
    let journal = AlertJournal::new(&runtime.alert_log_path);

    let mut runner = AlertRunner::new(
        AlertEngine::new(settings),
        http,
        Endpoints::default(),
        notifier,
        gate,
        journal,
    );

    if cli.once {
        let report = runner.run_cycle().await?;
        info!(
            "Cycle done: {} scored, {} sent, {} resolved",
            report.scored, report.sent, report.resolved
        );
        return Ok(());
    }

    runner.run_forever().await
}

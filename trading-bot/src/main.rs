use anyhow::{Context, Result};
use execution::{DeltaClient, Exchange};
use portfolio_risk::RiskManager;
use signal_generation::build_engine;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use trading_bot::{BotConfig, LoopSettings, Orchestrator};

#[tokio::main]
async fn main() -> ExitCode {
    let config = BotConfig::load();

    // Initialize logging
    let level = config
        .as_ref()
        .ok()
        .and_then(|c| c.log.level().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Trading bot stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: BotConfig) -> Result<()> {
    info!(
        symbol = %config.market.symbol,
        interval = %config.market.interval,
        testnet = config.exchange.testnet,
        "🚀 Starting hammer trading bot"
    );

    let client = DeltaClient::new(config.exchange.client_config())
        .context("failed to build exchange client")?;

    // An unknown symbol must stop the bot before the loop starts
    let product = client
        .resolve_product(&config.market.symbol)
        .await
        .with_context(|| format!("failed to resolve symbol {}", config.market.symbol))?;
    info!(product_id = product.id, product_symbol = %product.symbol, "Trading product");

    let engine = build_engine(&config.signal);
    if config.market.candle_count < engine.min_window() {
        warn!(
            candle_count = config.market.candle_count,
            required = engine.min_window(),
            "Candle count is below what the signal engine needs, every iteration will skip"
        );
    }

    let risk = RiskManager::new(config.risk.clone())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown_signal(shutdown_tx));

    let mut orchestrator = Orchestrator::new(client, engine, risk, LoopSettings::from(&config));
    orchestrator.run(shutdown_rx).await?;

    info!("👋 Shutting down gracefully...");
    Ok(())
}

/// Flip the shutdown flag on Ctrl+C or SIGTERM.
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, finishing current iteration");
    shutdown.send(true).ok();
}

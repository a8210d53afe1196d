//! The trading loop
//!
//! Each iteration walks candles → signal → cooldown → sizing → submission and
//! ends in exactly one [`IterationOutcome`], which is always logged.
//! Iterations never overlap and an in-flight iteration is never interrupted:
//! shutdown is observed only before fetching and while waiting for the next tick.

use crate::config::{BotConfig, PriceSource};
use crate::cooldown::{CooldownGuard, CooldownState};
use chrono::{DateTime, Utc};
use common::{CandleWindow, Interval, OrderAck};
use execution::{ErrorKind, Exchange, ExchangeError};
use portfolio_risk::{NoTradeReason, RiskError, RiskManager, Sizing};
use rust_decimal::Decimal;
use signal_generation::BoxedSignalEngine;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Position in the iteration state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Fetching,
    Signaling,
    CooldownCheck,
    Sizing,
    Submitting,
    CooldownUpdate,
}

/// Why an iteration ended without an order. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Hold,
    InsufficientHistory { have: usize, need: usize },
    CooldownActive { remaining: Duration },
    ZeroBalance,
    ZeroSize,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Hold => write!(f, "signal is HOLD"),
            SkipReason::InsufficientHistory { have, need } => {
                write!(f, "insufficient history ({have} of {need} candles)")
            }
            SkipReason::CooldownActive { remaining } => {
                write!(f, "cooldown active ({}s remaining)", remaining.as_secs())
            }
            SkipReason::ZeroBalance => write!(f, "zero balance"),
            SkipReason::ZeroSize => write!(f, "size rounds to zero"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    Traded(OrderAck),
    Skipped(SkipReason),
    Failed { kind: ErrorKind, error: String },
}

impl IterationOutcome {
    fn failed(err: ExchangeError) -> Self {
        IterationOutcome::Failed {
            kind: err.kind(),
            error: err.to_string(),
        }
    }

    /// Configuration failures stop the loop; everything else moves on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IterationOutcome::Failed {
                kind: ErrorKind::Configuration,
                ..
            }
        )
    }
}

impl From<RiskError> for IterationOutcome {
    /// The exchange reported a price or balance sizing cannot use.
    fn from(err: RiskError) -> Self {
        IterationOutcome::Failed {
            kind: ErrorKind::Malformed,
            error: err.to_string(),
        }
    }
}

/// Per-run market and cadence settings
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub symbol: String,
    pub interval: Interval,
    pub candle_count: usize,
    pub quote_currency: String,
    pub price_source: PriceSource,
    pub poll_interval: Duration,
    pub min_trade_interval: Duration,
}

impl From<&BotConfig> for LoopSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            symbol: config.market.symbol.clone(),
            interval: config.market.interval,
            candle_count: config.market.candle_count,
            quote_currency: config.market.quote_currency.clone(),
            price_source: config.trading.price_source,
            poll_interval: config.trading.poll_interval(config.market.interval),
            min_trade_interval: config.trading.min_trade_interval(),
        }
    }
}

pub struct Orchestrator<E: Exchange> {
    exchange: E,
    engine: BoxedSignalEngine,
    risk: RiskManager,
    cooldown: CooldownGuard,
    cooldown_state: CooldownState,
    settings: LoopSettings,
    state: LoopState,
    clock: fn() -> DateTime<Utc>,
}

impl<E: Exchange> Orchestrator<E> {
    pub fn new(exchange: E, engine: BoxedSignalEngine, risk: RiskManager, settings: LoopSettings) -> Self {
        Self {
            exchange,
            engine,
            risk,
            cooldown: CooldownGuard::new(settings.min_trade_interval),
            cooldown_state: CooldownState::new(),
            settings,
            state: LoopState::Idle,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used to timestamp iterations and acknowledgments.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cooldown_state(&self) -> &CooldownState {
        &self.cooldown_state
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "State transition");
        self.state = next;
    }

    /// Run until shutdown is signalled or a configuration error occurs.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(
            symbol = %self.settings.symbol,
            interval = %self.settings.interval,
            engine = %self.engine.source(),
            poll_secs = self.settings.poll_interval.as_secs(),
            "Trading loop started"
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed, stopping");
                    }
                    break;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_iteration((self.clock)()).await;
            report(&outcome);

            if let IterationOutcome::Failed { kind, error } = &outcome {
                if outcome.is_fatal() {
                    error!(kind = %kind, error = %error, "Fatal error, stopping trading loop");
                    anyhow::bail!("trading loop stopped: {error}");
                }
            }
        }

        info!("Trading loop stopped");
        Ok(())
    }

    /// One pass through the state machine. Always returns to `Idle`.
    ///
    /// `now` is the iteration start and gates the cooldown check; a trade is
    /// stamped with the clock reading taken after the acknowledgment.
    pub async fn run_iteration(&mut self, now: DateTime<Utc>) -> IterationOutcome {
        let outcome = self.iterate(now).await;
        self.transition(LoopState::Idle);
        outcome
    }

    async fn iterate(&mut self, now: DateTime<Utc>) -> IterationOutcome {
        self.transition(LoopState::Fetching);
        let window = match self
            .exchange
            .fetch_candles(&self.settings.symbol, self.settings.interval, self.settings.candle_count)
            .await
        {
            Ok(window) => window,
            Err(e) => return IterationOutcome::failed(e),
        };

        self.transition(LoopState::Signaling);
        let need = self.engine.min_window();
        if window.len() < need {
            return IterationOutcome::Skipped(SkipReason::InsufficientHistory {
                have: window.len(),
                need,
            });
        }

        let signal = self.engine.evaluate(&window);
        debug!(
            action = ?signal.action,
            confidence = signal.confidence,
            source = %signal.source,
            "Signal evaluated"
        );
        if !signal.is_buy() {
            return IterationOutcome::Skipped(SkipReason::Hold);
        }
        info!(
            confidence = signal.confidence,
            reference_low = ?signal.reference_low,
            source = %signal.source,
            "BUY signal"
        );

        self.transition(LoopState::CooldownCheck);
        if !self.cooldown.may_trade(now, &self.cooldown_state) {
            let remaining = self.cooldown.remaining(now, &self.cooldown_state);
            return IterationOutcome::Skipped(SkipReason::CooldownActive { remaining });
        }

        self.transition(LoopState::Sizing);
        let balance = match self.exchange.fetch_balance(&self.settings.quote_currency).await {
            Ok(balance) => balance,
            Err(e) => return IterationOutcome::failed(e),
        };
        let entry_price = match self.entry_price(&window).await {
            Ok(price) => price,
            Err(e) => return IterationOutcome::failed(e),
        };

        let order = match self.risk.size(&self.settings.symbol, &balance, &signal, entry_price) {
            Ok(Sizing::Trade(order)) => order,
            Ok(Sizing::NoTrade(reason)) => {
                return IterationOutcome::Skipped(match reason {
                    NoTradeReason::ZeroBalance => SkipReason::ZeroBalance,
                    NoTradeReason::HoldSignal => SkipReason::Hold,
                    NoTradeReason::ZeroSize => SkipReason::ZeroSize,
                })
            }
            Err(e) => return e.into(),
        };

        self.transition(LoopState::Submitting);
        let ack = match self.exchange.submit_order(&order).await {
            Ok(ack) => ack,
            Err(e) => return IterationOutcome::failed(e),
        };

        // cooldown runs from the acknowledgment, not the iteration start
        self.transition(LoopState::CooldownUpdate);
        self.cooldown_state.record_trade((self.clock)());
        IterationOutcome::Traded(ack)
    }

    /// Price the order is sized against. A missing ticker price falls back
    /// to the latest close.
    async fn entry_price(&self, window: &CandleWindow) -> Result<Decimal, ExchangeError> {
        let last_close = window.latest().map(|c| c.close).unwrap_or_default();

        match self.settings.price_source {
            PriceSource::LastClose => Ok(last_close),
            PriceSource::Ticker => {
                let ticker = self.exchange.fetch_ticker(&self.settings.symbol).await?;
                match ticker.price() {
                    Some(price) => Ok(price),
                    None => {
                        warn!(
                            symbol = %self.settings.symbol,
                            last_close = %last_close,
                            "Ticker has no usable price, using last close"
                        );
                        Ok(last_close)
                    }
                }
            }
        }
    }
}

/// Log one iteration's outcome.
pub fn report(outcome: &IterationOutcome) {
    match outcome {
        IterationOutcome::Traded(ack) => info!(
            order_id = %ack.order_id,
            client_order_id = ?ack.client_order_id,
            state = ?ack.state,
            "✅ Order placed"
        ),
        IterationOutcome::Skipped(reason) => info!(reason = %reason, "Iteration skipped"),
        IterationOutcome::Failed { kind, error } => match kind {
            ErrorKind::Authentication | ErrorKind::Configuration => {
                error!(kind = %kind, error = %error, "Iteration failed")
            }
            _ => warn!(kind = %kind, error = %error, "Iteration failed"),
        },
    }
}

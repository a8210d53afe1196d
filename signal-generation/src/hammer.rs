use crate::signals::SignalEngine;
use common::{Candle, CandleWindow, Signal, SignalSource};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Bullish hammer rule parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HammerConfig {
    /// Number of candles before the hammer that must trend down
    #[serde(default = "default_trend_lookback")]
    pub trend_lookback: usize,

    /// Lower wick must be at least this multiple of the body
    #[serde(default = "default_lower_wick_multiplier")]
    pub lower_wick_multiplier: Decimal,

    /// Upper wick must be at most this multiple of the body
    #[serde(default = "default_upper_wick_multiplier")]
    pub upper_wick_multiplier: Decimal,

    /// Minimum (min(open, close) - low) / range, i.e. how high the body sits
    #[serde(default = "default_body_position_min")]
    pub body_position_min: Decimal,

    /// Confidence attached to every BUY
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Default for HammerConfig {
    fn default() -> Self {
        Self {
            trend_lookback: default_trend_lookback(),
            lower_wick_multiplier: default_lower_wick_multiplier(),
            upper_wick_multiplier: default_upper_wick_multiplier(),
            body_position_min: default_body_position_min(),
            confidence: default_confidence(),
        }
    }
}

fn default_trend_lookback() -> usize {
    5
}

fn default_lower_wick_multiplier() -> Decimal {
    Decimal::TWO
}

fn default_upper_wick_multiplier() -> Decimal {
    Decimal::new(5, 1)
}

fn default_body_position_min() -> Decimal {
    Decimal::new(6, 1)
}

fn default_confidence() -> f64 {
    0.9
}

/// Rule-based hammer detector over the latest candle.
#[derive(Debug, Clone, Default)]
pub struct NumericHammerEngine {
    config: HammerConfig,
}

impl NumericHammerEngine {
    pub fn new(config: HammerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HammerConfig {
        &self.config
    }

    fn is_hammer_shape(&self, candle: &Candle) -> bool {
        let range = candle.range();
        if range <= Decimal::ZERO {
            return false;
        }

        let body = candle.body();
        let body_position = candle.lower_wick() / range;

        candle.lower_wick() >= self.config.lower_wick_multiplier * body
            && candle.upper_wick() <= self.config.upper_wick_multiplier * body
            && body_position >= self.config.body_position_min
    }
}

/// Sign of the least-squares slope of the closes.
///
/// With x = 0..n the slope numerator reduces to sum((2x - (n - 1)) * close),
/// which stays exact in decimal arithmetic.
fn closes_trend_down(candles: &[Candle]) -> bool {
    if candles.len() < 2 {
        return false;
    }
    let n = candles.len() as i64;
    let weighted: Decimal = candles
        .iter()
        .enumerate()
        .map(|(x, c)| Decimal::from(2 * x as i64 - (n - 1)) * c.close)
        .sum();
    weighted < Decimal::ZERO
}

impl SignalEngine for NumericHammerEngine {
    fn evaluate(&self, window: &CandleWindow) -> Signal {
        if window.len() < self.min_window() {
            debug!(
                len = window.len(),
                required = self.min_window(),
                "Not enough candles for hammer detection"
            );
            return Signal::hold(SignalSource::Numeric);
        }

        let candles = window.tail(self.config.trend_lookback + 1);
        let (prior, last) = candles.split_at(candles.len() - 1);
        let hammer = &last[0];

        if !self.is_hammer_shape(hammer) {
            return Signal::hold(SignalSource::Numeric);
        }

        if !closes_trend_down(prior) {
            debug!("Hammer shape found but no preceding downtrend");
            return Signal::hold(SignalSource::Numeric);
        }

        info!(
            open_time = %hammer.open_time,
            low = %hammer.low,
            close = %hammer.close,
            "Bullish hammer detected"
        );

        Signal::buy(SignalSource::Numeric, self.config.confidence, Some(hammer.low))
    }

    fn source(&self) -> SignalSource {
        SignalSource::Numeric
    }

    fn min_window(&self) -> usize {
        self.config.trend_lookback.max(1) + 1
    }
}

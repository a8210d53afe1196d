//! OHLCV candles and validated candle windows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Absolute distance between open and close.
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    /// Full high-to-low range.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

/// Errors raised while building a [`CandleWindow`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowError {
    #[error("candle at index {index} opens at {open_time}, not after the previous candle at {previous}")]
    NotIncreasing {
        index: usize,
        open_time: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

/// A hole in the window: consecutive candles further apart than one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleGap {
    /// Open time of the candle preceding the gap
    pub after: DateTime<Utc>,
    /// Number of candles missing between the two neighbours
    pub missing: i64,
}

/// The most recent candles, oldest first, with strictly increasing open times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleWindow {
    candles: Vec<Candle>,
}

impl CandleWindow {
    /// Build a window, rejecting any sequence whose open times do not strictly increase.
    pub fn new(candles: Vec<Candle>) -> Result<Self, WindowError> {
        for (index, pair) in candles.windows(2).enumerate() {
            if pair[1].open_time <= pair[0].open_time {
                return Err(WindowError::NotIncreasing {
                    index: index + 1,
                    open_time: pair[1].open_time,
                    previous: pair[0].open_time,
                });
            }
        }
        Ok(Self { candles })
    }

    /// Keep only the newest `count` candles.
    pub fn truncate_to_latest(mut self, count: usize) -> Self {
        if self.candles.len() > count {
            self.candles.drain(..self.candles.len() - count);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Most recent candle.
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The newest `n` candles (or all of them when the window is shorter).
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    /// Report spacing holes relative to `interval`. Gaps are surfaced, never filled.
    pub fn gaps(&self, interval: Interval) -> Vec<CandleGap> {
        let step = interval.seconds();
        self.candles
            .windows(2)
            .filter_map(|pair| {
                let elapsed = (pair[1].open_time - pair[0].open_time).num_seconds();
                let missing = elapsed / step - 1;
                (missing > 0).then(|| CandleGap {
                    after: pair[0].open_time,
                    missing,
                })
            })
            .collect()
    }
}

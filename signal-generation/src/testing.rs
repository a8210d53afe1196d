//! Candle fixtures shared by the engine tests.

use chrono::{TimeZone, Utc};
use common::{Candle, CandleWindow};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn candle(index: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
    Candle {
        open_time: Utc.timestamp_opt(1_700_000_000 + index * 300, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: dec!(10),
    }
}

/// `len` candles drifting down one point per candle, ending in the hammer
/// open=100 close=102 high=103 low=90.
pub fn hammer_window(len: usize) -> CandleWindow {
    let mut candles = Vec::with_capacity(len);
    let prior = len as i64 - 1;
    for i in 0..prior {
        let close = dec!(101) + Decimal::from(prior - i);
        candles.push(candle(i, close + dec!(1), close + dec!(2), close - dec!(1), close));
    }
    candles.push(candle(prior, dec!(100), dec!(103), dec!(90), dec!(102)));
    CandleWindow::new(candles).unwrap()
}

/// Same shape as [`hammer_window`] but the preceding candles trend upward.
pub fn uptrend_window(len: usize) -> CandleWindow {
    let mut candles = Vec::with_capacity(len);
    let prior = len as i64 - 1;
    for i in 0..prior {
        let close = dec!(80) + Decimal::from(i);
        candles.push(candle(i, close - dec!(1), close + dec!(1), close - dec!(2), close));
    }
    candles.push(candle(prior, dec!(100), dec!(103), dec!(90), dec!(102)));
    CandleWindow::new(candles).unwrap()
}

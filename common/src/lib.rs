//! Shared domain types for the trading loop.
//!
//! Everything that crosses a crate boundary lives here: candles and the
//! windows built from them, signals, balances and orders.

mod candle;
mod interval;
mod order;
mod signal;

pub use candle::{Candle, CandleGap, CandleWindow, WindowError};
pub use interval::{Interval, UnknownInterval};
pub use order::{AccountBalance, Order, OrderAck, OrderSide, OrderType};
pub use signal::{Signal, SignalAction, SignalSource};

pub use uuid::Uuid;

//! Risk Management
//!
//! Turns an account balance and a BUY signal into a bounded market order
//! with a protective stop. Each trade risks a fixed fraction of the
//! available balance; the stop sits at whichever is further from entry:
//! the configured percentage or the low of the pattern candle.

mod config;
mod risk;

pub use config::RiskConfig;
pub use risk::{floor_to_increment, NoTradeReason, RiskError, RiskManager, Sizing};

//! Position sizing under a fixed per-trade risk budget

use crate::config::RiskConfig;
use common::{AccountBalance, Order, Signal, SignalAction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Why sizing produced no order. These are expected outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoTradeReason {
    ZeroBalance,
    HoldSignal,
    /// Budget divided by stop distance floors to nothing
    ZeroSize,
}

impl fmt::Display for NoTradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoTradeReason::ZeroBalance => write!(f, "zero balance"),
            NoTradeReason::HoldSignal => write!(f, "signal is HOLD"),
            NoTradeReason::ZeroSize => write!(f, "size rounds to zero"),
        }
    }
}

/// Sizing result
#[derive(Debug, Clone, PartialEq)]
pub enum Sizing {
    Trade(Order),
    NoTrade(NoTradeReason),
}

/// Inputs the risk manager refuses to size against
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskError {
    #[error("entry price must be positive, got {0}")]
    InvalidEntryPrice(Decimal),
    #[error("available balance cannot be negative, got {0}")]
    NegativeBalance(Decimal),
    #[error("invalid risk setting {field} = {value}: {reason}")]
    InvalidConfig {
        field: &'static str,
        value: Decimal,
        reason: &'static str,
    },
}

/// Converts a balance and a signal into an order with a protective stop.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Result<Self, RiskError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Distance from entry to stop.
    ///
    /// The percentage distance is a floor; a pattern low further away than
    /// that widens the stop to the pattern's own structure.
    pub fn stop_distance(&self, entry_price: Decimal, reference_low: Option<Decimal>) -> Decimal {
        let percent_distance = entry_price * self.config.stop_loss_percent;
        match reference_low {
            Some(low) => percent_distance.max(entry_price - low),
            None => percent_distance,
        }
    }

    /// Size a market buy for `symbol` at `entry_price`.
    pub fn size(
        &self,
        symbol: &str,
        balance: &AccountBalance,
        signal: &Signal,
        entry_price: Decimal,
    ) -> Result<Sizing, RiskError> {
        if balance.available < Decimal::ZERO {
            return Err(RiskError::NegativeBalance(balance.available));
        }
        if balance.available.is_zero() {
            return Ok(Sizing::NoTrade(NoTradeReason::ZeroBalance));
        }
        if signal.action != SignalAction::Buy {
            return Ok(Sizing::NoTrade(NoTradeReason::HoldSignal));
        }
        if entry_price <= Decimal::ZERO {
            return Err(RiskError::InvalidEntryPrice(entry_price));
        }

        let risk_amount = balance.available * self.config.risk_percent;
        let stop_distance = self.stop_distance(entry_price, signal.reference_low);
        let size = floor_to_increment(risk_amount / stop_distance, self.config.size_increment);

        debug!(
            available = %balance.available,
            risk_amount = %risk_amount,
            stop_distance = %stop_distance,
            size = %size,
            "Position sizing"
        );

        if size.is_zero() {
            return Ok(Sizing::NoTrade(NoTradeReason::ZeroSize));
        }

        let stop_price = entry_price - stop_distance;
        info!(
            symbol,
            currency = %balance.currency,
            balance = %balance.available,
            risk = %risk_amount,
            size = %size,
            entry = %entry_price,
            stop = %stop_price,
            "Sized order"
        );

        Ok(Sizing::Trade(
            Order::market_buy(symbol, size, entry_price).with_stop(stop_price),
        ))
    }
}

/// Round `value` down to a whole number of `increment` steps.
pub fn floor_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO || value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((value / increment).floor() * increment).normalize()
}

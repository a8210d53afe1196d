//! Balances, orders and order acknowledgments

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Spendable funds in one currency, fetched fresh before each sizing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub available: Decimal,
    pub currency: String,
}

impl AccountBalance {
    pub fn new(available: Decimal, currency: impl Into<String>) -> Self {
        Self {
            available,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit(Decimal),
}

/// An order built by the risk manager and submitted exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Idempotency key sent with the order
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    /// Base-asset units, already floored to the tradable increment
    pub size: Decimal,
    pub order_type: OrderType,
    /// Price the sizing was computed against
    pub entry_price: Decimal,
    pub stop_price: Option<Decimal>,
}

impl Order {
    pub fn market_buy(symbol: impl Into<String>, size: Decimal, entry_price: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.into(),
            side: OrderSide::Buy,
            size,
            order_type: OrderType::Market,
            entry_price,
            stop_price: None,
        }
    }

    pub fn with_stop(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Client order id in the 32-character form accepted by the exchange.
    pub fn client_order_ref(&self) -> String {
        self.client_order_id.simple().to_string()
    }
}

/// Exchange acknowledgment of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_buy_builder() {
        let order = Order::market_buy("BTCUSD", dec!(1.5), dec!(102)).with_stop(dec!(90));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.stop_price, Some(dec!(90)));
        assert_eq!(order.client_order_ref().len(), 32);
    }
}

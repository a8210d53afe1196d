//! Wire formats for the REST API

use crate::error::ExchangeError;
use chrono::{TimeZone, Utc};
use common::{AccountBalance, Candle, Order, OrderAck, OrderSide, OrderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every response is wrapped as `{"success": .., "result": .., "error": ..}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub context: Option<Value>,
}

impl ApiErrorBody {
    pub fn code(&self) -> Option<String> {
        match &self.code {
            Value::Null => None,
            Value::String(code) => Some(code.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn message(&self) -> String {
        match &self.context {
            Some(context) => format!("{} {}", self.code().unwrap_or_default(), context),
            None => self.code().unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

/// A tradable instrument: the symbol-to-id mapping cached by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub symbol: String,
}

impl Product {
    /// Catalog entries may carry a `PERP` suffix on the configured symbol.
    pub fn matches(&self, symbol: &str) -> bool {
        self.symbol == symbol
            || self
                .symbol
                .strip_suffix("PERP")
                .is_some_and(|base| base == symbol)
    }
}

/// First catalog entry matching `symbol`.
pub fn find_product(products: &[Product], symbol: &str) -> Option<Product> {
    products
        .iter()
        .find(|p| p.symbol == symbol)
        .or_else(|| products.iter().find(|p| p.matches(symbol)))
        .cloned()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCandle {
    /// Open time in Unix seconds
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

impl TryFrom<WireCandle> for Candle {
    type Error = ExchangeError;

    fn try_from(wire: WireCandle) -> Result<Self, Self::Error> {
        let open_time = Utc
            .timestamp_opt(wire.time, 0)
            .single()
            .ok_or_else(|| ExchangeError::Decode(format!("candle time {} out of range", wire.time)))?;

        Ok(Candle {
            open_time,
            open: wire.open,
            high: wire.high,
            low: wire.low,
            close: wire.close,
            volume: wire.volume,
        })
    }
}

/// One wallet row. Accounts report the asset either flat (`asset_symbol`,
/// `symbol`) or nested (`asset: {"symbol": ..}`), and the free amount under
/// `available`, `available_balance` or `balance`.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalance {
    #[serde(default)]
    pub asset_symbol: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub asset: Option<Value>,
    #[serde(default)]
    pub available: Option<Decimal>,
    #[serde(default)]
    pub available_balance: Option<Decimal>,
    #[serde(default)]
    pub balance: Option<Decimal>,
}

impl WalletBalance {
    pub fn asset_code(&self) -> Option<&str> {
        self.asset_symbol
            .as_deref()
            .or_else(|| self.asset.as_ref()?.get("symbol")?.as_str())
            .or(self.symbol.as_deref())
    }

    pub fn free(&self) -> Decimal {
        self.available
            .or(self.available_balance)
            .or(self.balance)
            .unwrap_or_default()
    }
}

/// Available funds for `currency`; an absent asset counts as zero.
pub fn select_balance(rows: &[WalletBalance], currency: &str) -> Option<AccountBalance> {
    rows.iter()
        .find(|row| {
            row.asset_code()
                .is_some_and(|symbol| symbol.eq_ignore_ascii_case(currency))
        })
        .map(|row| AccountBalance::new(row.free(), currency))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub close: Option<Decimal>,
    #[serde(default)]
    pub mark_price: Option<Decimal>,
}

impl Ticker {
    /// Last traded price, or the mark price when no trade is reported.
    pub fn price(&self) -> Option<Decimal> {
        [self.close, self.mark_price]
            .into_iter()
            .flatten()
            .find(|price| *price > Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub product_id: i64,
    /// Sizes and prices travel as strings to avoid float rounding
    pub size: String,
    pub side: OrderSide,
    pub order_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bracket_stop_loss_price: Option<String>,
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn new(product: &Product, order: &Order) -> Self {
        let (order_type, limit_price) = match order.order_type {
            OrderType::Market => ("market_order", None),
            OrderType::Limit(price) => ("limit_order", Some(price.normalize().to_string())),
        };

        Self {
            product_id: product.id,
            size: order.size.normalize().to_string(),
            side: order.side,
            order_type,
            limit_price,
            bracket_stop_loss_price: order.stop_price.map(|p| p.normalize().to_string()),
            client_order_id: order.client_order_ref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    pub id: Value,
    #[serde(default)]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl From<WireOrder> for OrderAck {
    fn from(wire: WireOrder) -> Self {
        let order_id = match wire.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        OrderAck {
            order_id,
            client_order_id: wire.client_order_id,
            state: wire.state,
        }
    }
}

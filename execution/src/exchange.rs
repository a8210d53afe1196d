//! Exchange interface and its Delta implementation

use crate::client::DeltaClient;
use crate::error::ExchangeError;
use crate::types::{
    find_product, select_balance, OrderRequest, Product, Ticker, WalletBalance, WireCandle,
    WireOrder,
};
use chrono::Utc;
use common::{AccountBalance, Candle, CandleWindow, Interval, Order, OrderAck};
use tracing::{debug, info, warn};

/// Operations the trading loop needs from an exchange
#[async_trait::async_trait]
pub trait Exchange: Send + Sync {
    /// Look up (and cache) the product behind a configured symbol
    async fn resolve_product(&self, symbol: &str) -> Result<Product, ExchangeError>;

    /// The most recent `count` candles, oldest first
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleWindow, ExchangeError>;

    async fn fetch_balance(&self, currency: &str) -> Result<AccountBalance, ExchangeError>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    /// Place an order. Never resubmitted once it may have reached the exchange.
    async fn submit_order(&self, order: &Order) -> Result<OrderAck, ExchangeError>;
}

#[async_trait::async_trait]
impl Exchange for DeltaClient {
    async fn resolve_product(&self, symbol: &str) -> Result<Product, ExchangeError> {
        if let Some(product) = self.products.get(symbol) {
            return Ok(product.clone());
        }

        let catalog: Vec<Product> = self.public_get("/v2/products", &[]).await?;
        let product = find_product(&catalog, symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))?;

        info!(
            symbol,
            product_id = product.id,
            product_symbol = %product.symbol,
            "Resolved product"
        );
        self.products.insert(symbol.to_string(), product.clone());
        Ok(product)
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleWindow, ExchangeError> {
        let product = self.resolve_product(symbol).await?;

        let end = Utc::now().timestamp();
        let start = end - interval.seconds() * count as i64;
        let query = [
            ("symbol", product.symbol.clone()),
            ("resolution", interval.as_str().to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
        ];

        let wire: Vec<WireCandle> = self.public_get("/v2/history/candles", &query).await?;
        let window = build_window(wire, count)?;

        let gaps = window.gaps(interval);
        if !gaps.is_empty() {
            let missing: i64 = gaps.iter().map(|g| g.missing).sum();
            warn!(
                symbol,
                interval = %interval,
                gaps = gaps.len(),
                missing,
                first_gap_after = %gaps[0].after,
                "Candle history has gaps"
            );
        }

        debug!(symbol, candles = window.len(), "Fetched candles");
        Ok(window)
    }

    async fn fetch_balance(&self, currency: &str) -> Result<AccountBalance, ExchangeError> {
        let rows: Vec<WalletBalance> = self.signed_get("/v2/wallet/balances").await?;

        match select_balance(&rows, currency) {
            Some(balance) => Ok(balance),
            None => {
                warn!(currency, assets = rows.len(), "Currency not found in wallet, treating as zero");
                Ok(AccountBalance::zero(currency))
            }
        }
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let product = self.resolve_product(symbol).await?;
        let path = format!("/v2/tickers/{}", product.symbol);
        self.public_get(&path, &[]).await
    }

    async fn submit_order(&self, order: &Order) -> Result<OrderAck, ExchangeError> {
        let product = self.resolve_product(&order.symbol).await?;
        let request = OrderRequest::new(&product, order);
        let body = serde_json::to_string(&request)?;

        info!(
            product_id = product.id,
            side = %order.side,
            size = %request.size,
            stop = ?request.bracket_stop_loss_price,
            client_order_id = %request.client_order_id,
            "Submitting order"
        );

        let wire: WireOrder = self.signed_post("/v2/orders", body).await?;
        Ok(wire.into())
    }
}

/// Order the rows oldest first, enforce strictly increasing open times and
/// keep the newest `count`.
fn build_window(wire: Vec<WireCandle>, count: usize) -> Result<CandleWindow, ExchangeError> {
    let mut candles = wire
        .into_iter()
        .map(Candle::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    candles.sort_by_key(|c| c.open_time);

    let window = CandleWindow::new(candles).map_err(|e| ExchangeError::Decode(e.to_string()))?;
    Ok(window.truncate_to_latest(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn wire(time: i64, close: i64) -> WireCandle {
        serde_json::from_value(serde_json::json!({
            "time": time,
            "open": close,
            "high": close + 1,
            "low": close - 1,
            "close": close,
            "volume": 1
        }))
        .unwrap()
    }

    #[test]
    fn test_window_is_sorted_and_truncated() {
        let rows = vec![wire(600, 3), wire(0, 1), wire(900, 4), wire(300, 2)];
        let window = build_window(rows, 3).unwrap();

        let closes: Vec<_> = window.candles().iter().map(|c| c.close.to_string()).collect();
        assert_eq!(closes, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_duplicate_open_times_are_malformed() {
        let rows = vec![wire(0, 1), wire(300, 2), wire(300, 3)];
        let err = build_window(rows, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_empty_history_is_an_empty_window() {
        let window = build_window(Vec::new(), 100).unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn test_cached_product_skips_catalog_lookup() {
        let client = DeltaClient::new(
            crate::config::ExchangeConfig::testnet().with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        client.products.insert(
            "BTCUSD".to_string(),
            Product { id: 27, symbol: "BTCUSD".to_string() },
        );

        let product = client.resolve_product("BTCUSD").await.unwrap();
        assert_eq!(product.id, 27);
    }
}

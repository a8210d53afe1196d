// Execution
// Authenticated Delta Exchange client: product resolution, market data,
// balances and order submission behind the `Exchange` trait.

pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod retry;
pub mod signing;
pub mod types;

pub use client::DeltaClient;
pub use config::{ExchangeConfig, PRODUCTION_URL, TESTNET_URL};
pub use error::{ErrorKind, ExchangeError};
pub use exchange::Exchange;
pub use retry::RetryPolicy;
pub use signing::{sign, AuthHeaders, Credentials};
pub use types::{Product, Ticker};

//! Bot configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file
//! (`config/bot.toml`, or the path in `BOT_CONFIG` / the first CLI argument),
//! `BOT__SECTION__KEY` environment variables, and finally the flat variables
//! (`SYMBOL`, `RISK_PERCENT`, `DELTA_API_KEY`, ...) older deployments set.

use common::Interval;
use execution::{ExchangeConfig, RetryPolicy};
use portfolio_risk::{RiskConfig, RiskError};
use serde::{Deserialize, Serialize};
use signal_generation::SignalConfig;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";
pub const CONFIG_PATH_VAR: &str = "BOT_CONFIG";
const ENV_PREFIX: &str = "BOT";
const ENV_SEPARATOR: &str = "__";

/// Flat variable name and the key it overrides.
const LEGACY_VARS: &[(&str, &str)] = &[
    ("EXCHANGE_NAME", "exchange.name"),
    ("DELTA_API_KEY", "exchange.api_key"),
    ("DELTA_API_SECRET", "exchange.api_secret"),
    ("DELTA_TESTNET", "exchange.testnet"),
    ("SYMBOL", "market.symbol"),
    ("INTERVAL", "market.interval"),
    ("CANDLE_COUNT", "market.candle_count"),
    ("RISK_PERCENT", "risk.risk_percent"),
    ("STOP_LOSS_PERCENT", "risk.stop_loss_percent"),
    ("SIGNAL_ENGINE", "signal.engine"),
    ("CV_THRESHOLD", "signal.confidence_threshold"),
    ("CV_MODEL_WEIGHTS", "signal.model_path"),
    ("MIN_TRADE_INTERVAL_SECONDS", "trading.min_trade_interval_secs"),
    ("LOG_LEVEL", "log.level"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("unsupported exchange '{0}', only 'delta' is available")]
    UnsupportedExchange(String),

    #[error("exchange.api_key and exchange.api_secret are required")]
    MissingCredentials,

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Risk(#[from] RiskError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub exchange: ExchangeSettings,
    pub market: MarketSettings,
    pub risk: RiskConfig,
    pub signal: SignalConfig,
    pub trading: TradingSettings,
    pub log: LogSettings,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ExchangeSettings {
    #[serde(default = "default_exchange_name")]
    pub name: String,

    /// Trade against the testnet endpoint
    #[serde(default = "default_testnet")]
    pub testnet: bool,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            name: default_exchange_name(),
            testnet: default_testnet(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for ExchangeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeSettings")
            .field("name", &self.name)
            .field("testnet", &self.testnet)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ExchangeSettings {
    /// Client settings for the selected network
    pub fn client_config(&self) -> ExchangeConfig {
        let mut config = ExchangeConfig::for_network(self.testnet)
            .with_credentials(self.api_key.trim(), self.api_secret.trim())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retry(self.retry.clone());
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettings {
    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_interval")]
    pub interval: Interval,

    /// Candles requested per iteration
    #[serde(default = "default_candle_count")]
    pub candle_count: usize,

    /// Currency the balance is read in
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            interval: default_interval(),
            candle_count: default_candle_count(),
            quote_currency: default_quote_currency(),
        }
    }
}

/// Where the entry price used for sizing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Ticker,
    LastClose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSettings {
    /// Minimum time between two submitted orders
    #[serde(default = "default_min_trade_interval_secs")]
    pub min_trade_interval_secs: u64,

    /// Seconds between iterations; 0 follows the candle interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_price_source")]
    pub price_source: PriceSource,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            min_trade_interval_secs: default_min_trade_interval_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            price_source: default_price_source(),
        }
    }
}

impl TradingSettings {
    pub fn min_trade_interval(&self) -> Duration {
        Duration::from_secs(self.min_trade_interval_secs)
    }

    pub fn poll_interval(&self, candle_interval: Interval) -> Duration {
        match self.poll_interval_secs {
            0 => Duration::from_secs(candle_interval.seconds().unsigned_abs()),
            secs => Duration::from_secs(secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogSettings {
    pub fn level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(self.level.trim()).map_err(|_| ConfigError::Invalid {
            field: "log.level",
            reason: format!("unknown level '{}'", self.level),
        })
    }
}

impl BotConfig {
    /// Load from the process environment and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_PATH_VAR).ok())
            .map(PathBuf::from);
        let env: HashMap<String, String> = std::env::vars().collect();

        let config = Self::from_layers(path.as_deref(), &env)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge the layers without validating. An explicit `path` must exist;
    /// the default path is optional.
    pub fn from_layers(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false),
        };

        let mut builder = config::Config::builder().add_source(file).add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .source(Some(env.clone().into_iter().collect())),
        );

        for (var, key) in LEGACY_VARS {
            let value = env.get(*var).filter(|v| !v.trim().is_empty()).cloned();
            builder = builder.set_override_option(*key, value)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.exchange.name.trim().eq_ignore_ascii_case("delta") {
            return Err(ConfigError::UnsupportedExchange(self.exchange.name.clone()));
        }
        if self.exchange.api_key.trim().is_empty() || self.exchange.api_secret.trim().is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        if self.exchange.timeout_secs == 0 {
            return Err(invalid("exchange.timeout_secs", "must be at least 1"));
        }
        if self.exchange.retry.max_attempts == 0 {
            return Err(invalid("exchange.retry.max_attempts", "must be at least 1"));
        }
        if self.market.symbol.trim().is_empty() {
            return Err(invalid("market.symbol", "must not be empty"));
        }
        if self.market.candle_count == 0 {
            return Err(invalid("market.candle_count", "must be at least 1"));
        }

        self.risk.validate()?;

        let threshold = self.signal.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "signal.confidence_threshold",
                &format!("{threshold} is outside [0, 1]"),
            ));
        }
        if !(0.0..=1.0).contains(&self.signal.hammer.confidence) {
            return Err(invalid("signal.hammer.confidence", "must be within [0, 1]"));
        }

        self.log.level()?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn default_exchange_name() -> String {
    "delta".to_string()
}

fn default_testnet() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_symbol() -> String {
    "BTCUSD".to_string()
}

fn default_interval() -> Interval {
    Interval::FiveMinutes
}

fn default_candle_count() -> usize {
    100
}

fn default_quote_currency() -> String {
    "USD".to_string()
}

fn default_min_trade_interval_secs() -> u64 {
    300
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_price_source() -> PriceSource {
    PriceSource::Ticker
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use signal_generation::EngineSelector;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn with_credentials() -> HashMap<String, String> {
        env(&[("DELTA_API_KEY", "key"), ("DELTA_API_SECRET", "secret")])
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = BotConfig::from_layers(None, &HashMap::new()).unwrap();

        assert_eq!(config.exchange.name, "delta");
        assert!(config.exchange.testnet);
        assert_eq!(config.market.symbol, "BTCUSD");
        assert_eq!(config.market.interval, Interval::FiveMinutes);
        assert_eq!(config.market.candle_count, 100);
        assert_eq!(config.risk.risk_percent, dec!(0.02));
        assert_eq!(config.signal.engine, EngineSelector::Auto);
        assert_eq!(config.trading.min_trade_interval_secs, 300);
        assert_eq!(config.trading.price_source, PriceSource::Ticker);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = BotConfig::from_layers(None, &HashMap::new()).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingCredentials)));

        let config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_variables() {
        let mut vars = with_credentials();
        vars.extend(env(&[
            ("SYMBOL", "ETHUSD"),
            ("INTERVAL", "15m"),
            ("CANDLE_COUNT", "50"),
            ("RISK_PERCENT", "0.01"),
            ("MIN_TRADE_INTERVAL_SECONDS", "600"),
            ("SIGNAL_ENGINE", "cv"),
            ("CV_THRESHOLD", "0.8"),
            ("DELTA_TESTNET", "false"),
        ]));

        let config = BotConfig::from_layers(None, &vars).unwrap();
        assert_eq!(config.market.symbol, "ETHUSD");
        assert_eq!(config.market.interval, Interval::FifteenMinutes);
        assert_eq!(config.market.candle_count, 50);
        assert_eq!(config.risk.risk_percent, dec!(0.01));
        assert_eq!(config.trading.min_trade_interval_secs, 600);
        assert_eq!(config.signal.engine, EngineSelector::Learned);
        assert!((config.signal.confidence_threshold - 0.8).abs() < 1e-9);
        assert!(!config.exchange.testnet);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_then_env_then_legacy() {
        let path = std::env::temp_dir().join(format!("bot-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[market]\nsymbol = \"SOLUSD\"\ncandle_count = 40\n\n[trading]\nprice_source = \"last_close\"\npoll_interval_secs = 0\n"
        )
        .unwrap();

        let vars = env(&[("BOT__MARKET__CANDLE_COUNT", "60"), ("BOT__MARKET__QUOTE_CURRENCY", "USDT")]);
        let config = BotConfig::from_layers(Some(&path), &vars).unwrap();
        assert_eq!(config.market.symbol, "SOLUSD");
        assert_eq!(config.market.candle_count, 60);
        assert_eq!(config.market.quote_currency, "USDT");
        assert_eq!(config.trading.price_source, PriceSource::LastClose);
        assert_eq!(
            config.trading.poll_interval(config.market.interval),
            Duration::from_secs(300)
        );

        let mut vars = vars;
        vars.insert("SYMBOL".to_string(), "BTCUSD".to_string());
        let config = BotConfig::from_layers(Some(&path), &vars).unwrap();
        assert_eq!(config.market.symbol, "BTCUSD");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_digit_only_credentials_keep_leading_zeros() {
        let vars = env(&[
            ("BOT__EXCHANGE__API_KEY", "000451"),
            ("BOT__EXCHANGE__API_SECRET", "007123"),
        ]);
        let config = BotConfig::from_layers(None, &vars).unwrap();
        assert_eq!(config.exchange.api_key, "000451");
        assert_eq!(config.exchange.api_secret, "007123");

        let vars = env(&[("DELTA_API_KEY", "0042"), ("DELTA_API_SECRET", "0099")]);
        let config = BotConfig::from_layers(None, &vars).unwrap();
        assert_eq!(config.exchange.api_key, "0042");
        assert_eq!(config.exchange.api_secret, "0099");
    }

    #[test]
    fn test_env_strings_still_convert_to_numbers_and_flags() {
        let vars = env(&[
            ("BOT__EXCHANGE__TESTNET", "false"),
            ("BOT__MARKET__CANDLE_COUNT", "75"),
            ("BOT__RISK__RISK_PERCENT", "0.015"),
        ]);
        let config = BotConfig::from_layers(None, &vars).unwrap();
        assert!(!config.exchange.testnet);
        assert_eq!(config.market.candle_count, 75);
        assert_eq!(config.risk.risk_percent, dec!(0.015));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let path = Path::new("/nonexistent/bot.toml");
        assert!(matches!(
            BotConfig::from_layers(Some(path), &HashMap::new()),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut vars = with_credentials();
        vars.insert("EXCHANGE_NAME".to_string(), "binance".to_string());
        let config = BotConfig::from_layers(None, &vars).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnsupportedExchange(_))));

        let mut config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        config.market.candle_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "market.candle_count", .. })));

        let mut config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        config.signal.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        config.risk.stop_loss_percent = dec!(0);
        assert!(matches!(config.validate(), Err(ConfigError::Risk(_))));

        let mut config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        config.log.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_interval_fails_to_load() {
        let vars = env(&[("INTERVAL", "7m")]);
        assert!(BotConfig::from_layers(None, &vars).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_client_config_follows_network() {
        let config = BotConfig::from_layers(None, &with_credentials()).unwrap();
        let client = config.exchange.client_config();
        assert_eq!(client.base_url, execution::TESTNET_URL);
        assert!(client.has_credentials());
        assert_eq!(client.timeout, Duration::from_secs(10));
    }
}

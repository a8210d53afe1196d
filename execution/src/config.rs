//! Client configuration

use crate::retry::RetryPolicy;
use crate::signing::Credentials;
use std::time::Duration;

pub const PRODUCTION_URL: &str = "https://api.delta.exchange";
pub const TESTNET_URL: &str = "https://testnet-api.delta.exchange";

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub credentials: Option<Credentials>,
    /// Bound on every HTTP call
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: PRODUCTION_URL.to_string(),
            credentials: None,
            timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn production() -> Self {
        Self::default()
    }

    pub fn testnet() -> Self {
        Self {
            base_url: TESTNET_URL.to_string(),
            ..Default::default()
        }
    }

    /// Production or testnet endpoint
    pub fn for_network(testnet: bool) -> Self {
        if testnet {
            Self::testnet()
        } else {
            Self::production()
        }
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(api_key, api_secret));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(Credentials::is_complete)
    }

    pub fn is_testnet(&self) -> bool {
        self.base_url == TESTNET_URL
    }
}

pub fn default_user_agent() -> String {
    format!("hammer-bot/{}", env!("CARGO_PKG_VERSION"))
}

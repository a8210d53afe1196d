//! Exchange error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes the exchange uses for credential and signature problems.
const AUTH_ERROR_CODES: &[&str] = &[
    "invalid_api_key",
    "expired_signature",
    "Signature Mismatch",
    "unauthorized",
    "ip_not_whitelisted_for_api_key",
];

/// Closed classification the orchestrator uses to decide between retry,
/// skip and stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Fatal: bad settings, missing credentials, unknown symbol
    Configuration,
    /// Credentials rejected; never retried
    Authentication,
    /// Network trouble, timeouts, rate limits and 5xx
    Transient,
    /// The exchange refused the request
    Rejected,
    /// Payload could not be decoded
    Malformed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Transient => "transient",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("API credentials not configured")]
    MissingCredentials,

    #[error("symbol {0} not found in the product catalog")]
    UnknownSymbol(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request never reached the server
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// 2xx response carrying `success: false`
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ExchangeError>,
    },
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::MissingCredentials
            | ExchangeError::UnknownSymbol(_)
            | ExchangeError::InvalidConfig(_) => ErrorKind::Configuration,
            ExchangeError::Connect(_)
            | ExchangeError::Timeout
            | ExchangeError::Transport(_)
            | ExchangeError::RetriesExhausted { .. } => ErrorKind::Transient,
            ExchangeError::Http { status, code, .. } => {
                if matches!(status, 401 | 403) || code.as_deref().is_some_and(is_auth_code) {
                    ErrorKind::Authentication
                } else if *status == 429 || *status >= 500 {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Rejected
                }
            }
            ExchangeError::Api { code, .. } => {
                if is_auth_code(code) {
                    ErrorKind::Authentication
                } else {
                    ErrorKind::Rejected
                }
            }
            ExchangeError::Decode(_) => ErrorKind::Malformed,
        }
    }

    /// Whether a read may be repeated. Exhaustion itself is final.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExchangeError::RetriesExhausted { .. })
            && self.kind() == ErrorKind::Transient
    }

    /// Whether the request provably never left this process, which is the
    /// only condition under which an order submission may be repeated.
    pub fn is_connect(&self) -> bool {
        matches!(self, ExchangeError::Connect(_))
    }

    pub fn is_auth_error(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout
        } else if err.is_connect() {
            ExchangeError::Connect(err.to_string())
        } else if err.is_decode() {
            ExchangeError::Decode(err.to_string())
        } else if err.is_builder() {
            ExchangeError::InvalidConfig(err.to_string())
        } else {
            ExchangeError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Decode(err.to_string())
    }
}

fn is_auth_code(code: &str) -> bool {
    AUTH_ERROR_CODES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(code))
}

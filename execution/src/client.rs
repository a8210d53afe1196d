//! HTTP client for the Delta Exchange REST API.

use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::types::{Envelope, Product};
use dashmap::DashMap;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error};

/// Authenticated REST client. Owns the HTTP session and the symbol-to-product cache.
#[derive(Debug, Clone)]
pub struct DeltaClient {
    config: Arc<ExchangeConfig>,
    http: Client,
    pub(crate) products: Arc<DashMap<String, Product>>,
}

impl DeltaClient {
    pub fn new(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            products: Arc::new(DashMap::new()),
        })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Unauthenticated GET, retried on transient failures.
    pub async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        self.config
            .retry
            .run(path, ExchangeError::is_retryable, || {
                self.send(Method::GET, path, query, None)
            })
            .await
    }

    /// Signed GET, retried on transient failures.
    pub async fn signed_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        self.config
            .retry
            .run(path, ExchangeError::is_retryable, || {
                self.send(Method::GET, path, &[], Some(String::new()))
            })
            .await
    }

    /// Signed POST. Repeated only when the request never reached the server,
    /// so an order cannot be placed twice.
    pub async fn signed_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: String,
    ) -> Result<T, ExchangeError> {
        self.config
            .retry
            .run(path, ExchangeError::is_connect, || {
                self.send(Method::POST, path, &[], Some(body.clone()))
            })
            .await
    }

    /// One request. `signed_body` is `Some` for authenticated calls and holds
    /// the exact bytes that are both signed and sent.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        signed_body: Option<String>,
    ) -> Result<T, ExchangeError> {
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .header("Content-Type", "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(body) = signed_body {
            let credentials = self
                .config
                .credentials
                .as_ref()
                .filter(|c| c.is_complete())
                .ok_or(ExchangeError::MissingCredentials)?;

            let timestamp = chrono::Utc::now().timestamp();
            let auth = credentials.auth_headers(method.as_str(), path, timestamp, &body)?;
            for (name, value) in auth.pairs() {
                request = request.header(name, value);
            }
            if !body.is_empty() {
                request = request.body(body);
            }
        }

        debug!(method = %method, path, "Sending request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        handle_response(status, &text)
    }
}

/// Classify a response and unwrap its `result`.
pub(crate) fn handle_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, ExchangeError> {
    if !status.is_success() {
        let api_error = serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|envelope| envelope.error);

        let (code, message) = match api_error {
            Some(err) => (err.code(), err.message()),
            None => (None, truncate(body, 200)),
        };

        return Err(ExchangeError::Http {
            status: status.as_u16(),
            code,
            message,
        });
    }

    let envelope: Envelope<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
        error!(body = %truncate(body, 200), "Failed to parse response");
        ExchangeError::from(e)
    })?;

    if !envelope.success {
        let (code, message) = match envelope.error {
            Some(err) => (err.code().unwrap_or_default(), err.message()),
            None => (String::new(), "request unsuccessful".to_string()),
        };
        return Err(ExchangeError::Api { code, message });
    }

    let result = envelope
        .result
        .ok_or_else(|| ExchangeError::Decode("response has no result".to_string()))?;

    Ok(serde_json::from_value(result)?)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::retry::RetryPolicy;
    use crate::signing::sign;
    use crate::types::Ticker;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Loopback HTTP server answering every request with one canned response.
    struct StubServer {
        base_url: String,
        hits: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(status: u16, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let hits = Arc::new(AtomicUsize::new(0));
            let requests = Arc::new(Mutex::new(Vec::new()));

            let (counter, log) = (hits.clone(), requests.clone());
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let raw = read_request(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    log.lock().unwrap().push(raw);

                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    socket.write_all(response.as_bytes()).await.ok();
                    socket.shutdown().await.ok();
                }
            });

            Self { base_url, hits, requests }
        }

        fn client(&self) -> DeltaClient {
            let config = ExchangeConfig::testnet()
                .with_base_url(self.base_url.clone())
                .with_credentials("key", "secret")
                .with_retry(RetryPolicy {
                    max_attempts: 3,
                    base_delay_ms: 1,
                    max_delay_ms: 2,
                    jitter: false,
                });
            DeltaClient::new(config).unwrap()
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> String {
            self.requests.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&raw);
            if let Some(end) = text.find("\r\n\r\n") {
                let (head, _) = split_request(&text);
                let length = head
                    .get("content-length")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&raw).into_owned()
    }

    /// Lowercased header map plus body.
    fn split_request(raw: &str) -> (HashMap<String, String>, String) {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
        let headers = head
            .lines()
            .skip(1)
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        (headers, body.to_string())
    }

    #[tokio::test]
    async fn test_signed_get_carries_auth_headers() {
        let server = StubServer::start(200, r#"{"success":true,"result":[]}"#).await;
        let rows: Vec<serde_json::Value> = server.client().signed_get("/v2/wallet/balances").await.unwrap();
        assert!(rows.is_empty());

        let (headers, _) = split_request(&server.last_request());
        assert_eq!(headers.get("api-key").map(String::as_str), Some("key"));
        let timestamp = headers.get("timestamp").expect("timestamp header");
        assert!(timestamp.parse::<i64>().is_ok());
        let expected = sign("secret", "GET", "/v2/wallet/balances", timestamp, "").unwrap();
        assert_eq!(headers.get("signature"), Some(&expected));
    }

    #[tokio::test]
    async fn test_signed_post_signs_the_body_it_sends() {
        let server = StubServer::start(200, r#"{"success":true,"result":{"id":1,"state":"open"}}"#).await;
        let body = r#"{"product_id":27,"size":"1","side":"buy","order_type":"market_order"}"#;
        let _: serde_json::Value = server.client().signed_post("/v2/orders", body.to_string()).await.unwrap();

        let (headers, sent) = split_request(&server.last_request());
        assert_eq!(sent, body);
        let timestamp = headers.get("timestamp").expect("timestamp header");
        let expected = sign("secret", "POST", "/v2/orders", timestamp, body).unwrap();
        assert_eq!(headers.get("signature"), Some(&expected));
    }

    #[tokio::test]
    async fn test_unauthorized_read_is_sent_once() {
        let server = StubServer::start(401, r#"{"success":false,"error":{"code":"invalid_api_key"}}"#).await;
        let err = server
            .client()
            .signed_get::<serde_json::Value>("/v2/wallet/balances")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_server_error_read_is_retried_to_the_limit() {
        let server = StubServer::start(500, r#"{"success":false,"error":{"code":"internal_error"}}"#).await;
        let err = server
            .client()
            .signed_get::<serde_json::Value>("/v2/wallet/balances")
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_server_error_order_is_not_resubmitted() {
        let server = StubServer::start(500, r#"{"success":false,"error":{"code":"internal_error"}}"#).await;
        let err = server
            .client()
            .signed_post::<serde_json::Value>("/v2/orders", "{}".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::Http { status: 500, .. }));
        assert_eq!(server.hits(), 1);
    }

    #[test]
    fn test_success_unwraps_result() {
        let ticker: Ticker = handle_response(
            StatusCode::OK,
            r#"{"success":true,"result":{"symbol":"BTCUSD","close":"27000"}}"#,
        )
        .unwrap();
        assert_eq!(ticker.symbol.as_deref(), Some("BTCUSD"));
    }

    #[test]
    fn test_unsuccessful_2xx_is_classified_by_code() {
        let err = handle_response::<Ticker>(
            StatusCode::OK,
            r#"{"success":false,"error":{"code":"expired_signature"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);

        let err = handle_response::<Ticker>(
            StatusCode::OK,
            r#"{"success":false,"error":{"code":"insufficient_margin"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_error_status_classification() {
        let err = handle_response::<Ticker>(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"error":{"code":"invalid_api_key"}}"#,
        )
        .unwrap_err();
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());

        let err = handle_response::<Ticker>(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);

        let err = handle_response::<Ticker>(StatusCode::TOO_MANY_REQUESTS, "").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_undecodable_body_is_malformed() {
        let err = handle_response::<Ticker>(StatusCode::OK, "not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let err = handle_response::<Ticker>(StatusCode::OK, r#"{"success":true}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_signed_call_without_credentials_is_configuration_error() {
        let client = DeltaClient::new(ExchangeConfig::testnet()).unwrap();
        let err = client
            .signed_get::<serde_json::Value>("/v2/wallet/balances")
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::MissingCredentials));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RateError;
use crate::models::{ApiResponse, RateSnapshot};

/// Where fresh rate tables come from.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_latest(&self, base_currency: &str) -> Result<RateSnapshot, RateError>;
}

/// Client for the open.er-api.com `latest` endpoint.
pub struct HttpRateSource {
    client: Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(config: &Config) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| RateError::Network(format!("unable to build HTTP client: {}", err)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    pub fn url_for(&self, base_currency: &str) -> String {
        format!("{}/{}", self.base_url, base_currency)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_latest(&self, base_currency: &str) -> Result<RateSnapshot, RateError> {
        let url = self.url_for(base_currency);
        debug!(%url, "requesting latest rates");

        let response = self.client.get(&url).send().await.map_err(|err| {
            warn!(%url, error = %err, "rate request failed");
            RateError::from(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "rate request rejected");
            return Err(RateError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        parse_snapshot(base_currency, &body, SystemTime::now())
    }
}

/// Parses an API body, matching field names regardless of case.
pub fn parse_snapshot(base_currency: &str, body: &str, fetched_at: SystemTime) -> Result<RateSnapshot, RateError> {
    if body.trim().is_empty() {
        return Err(RateError::Parse("empty body".into()));
    }

    let value: Value = serde_json::from_str(body).map_err(|err| RateError::Parse(err.to_string()))?;
    let fields = match value {
        Value::Object(fields) => lowercase_keys(fields),
        other => return Err(RateError::Parse(format!("expected a JSON object, got {}", other))),
    };

    let response: ApiResponse =
        serde_json::from_value(Value::Object(fields)).map_err(|err| RateError::Parse(err.to_string()))?;

    Ok(RateSnapshot::from_response(base_currency, response, fetched_at))
}

fn lowercase_keys(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const SAMPLE: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "time_last_update_utc": "Sat, 17 Oct 2026 00:02:31 +0000",
        "rates": {"USD": 1, "KZT": 512.37, "EUR": 0.92}
    }"#;

    /// Serves a single canned HTTP response on a random local port.
    /// The handle yields the raw request head that was received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 2048];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}/v6/latest", addr), handle)
    }

    fn source_for(url: String) -> HttpRateSource {
        HttpRateSource::new(&Config {
            api_base_url: url,
            request_timeout: Duration::from_secs(5),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_sample_body() {
        let snapshot = parse_snapshot("USD", SAMPLE, SystemTime::now()).unwrap();
        assert!(snapshot.is_success());
        assert_eq!(snapshot.base_currency, "USD");
        assert_eq!(snapshot.rate_for("KZT"), Some(dec!(512.37)));
        assert_eq!(snapshot.last_update_label.as_deref(), Some("Sat, 17 Oct 2026 00:02:31 +0000"));
    }

    #[test]
    fn long_rates_survive_parsing() {
        let body = r#"{"result":"success","rates":{"KZT":512.3700000000000000001}}"#;
        let snapshot = parse_snapshot("USD", body, SystemTime::now()).unwrap();
        assert_eq!(snapshot.rate_for("KZT"), Some(dec!(512.3700000000000000001)));
    }

    #[test]
    fn field_names_match_case_insensitively() {
        let body = r#"{"Result":"success","BASE_CODE":"usd","Rates":{"KZT":450}}"#;
        let snapshot = parse_snapshot("USD", body, SystemTime::now()).unwrap();
        assert!(snapshot.is_success());
        assert_eq!(snapshot.rate_for("KZT"), Some(dec!(450)));
    }

    #[test]
    fn missing_rates_is_not_a_parse_error() {
        let snapshot = parse_snapshot("USD", r#"{"result":"error"}"#, SystemTime::now()).unwrap();
        assert!(!snapshot.is_success());
        assert!(snapshot.rates.is_none());
    }

    #[test]
    fn rejects_empty_and_malformed_bodies() {
        for body in ["", "   ", "null", "[1,2]", "<html>", r#"{"rates": "lots"}"#] {
            assert!(
                matches!(parse_snapshot("USD", body, SystemTime::now()), Err(RateError::Parse(_))),
                "body {:?} should not parse",
                body
            );
        }
    }

    #[test]
    fn url_appends_base_code() {
        let source = HttpRateSource::new(&Config::default()).unwrap();
        assert_eq!(source.url_for("USD"), "https://open.er-api.com/v6/latest/USD");
    }

    #[tokio::test]
    async fn fetches_over_http() {
        let (url, request) = serve_once("200 OK", SAMPLE).await;
        let snapshot = source_for(url).fetch_latest("USD").await.unwrap();
        assert_eq!(snapshot.rate_for("KZT"), Some(dec!(512.37)));

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /v6/latest/USD HTTP/1.1\r\n"), "{}", request);
    }

    #[tokio::test]
    async fn sends_user_agent() {
        let (url, request) = serve_once("200 OK", SAMPLE).await;
        source_for(url).fetch_latest("EUR").await.unwrap();

        let request = request.await.unwrap();
        let agent = request
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("user-agent").then(|| value.trim().to_string())
            })
            .expect("no User-Agent header sent");
        assert_eq!(agent, "KztPriceConsole/1.0");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _) = serve_once("503 Service Unavailable", "{}").await;
        let err = source_for(url).fetch_latest("USD").await.unwrap_err();
        assert_eq!(err, RateError::HttpStatus(503));
    }

    #[tokio::test]
    async fn garbage_body_is_a_parse_error() {
        let (url, _) = serve_once("200 OK", "not json").await;
        let err = source_for(url).fetch_latest("USD").await.unwrap_err();
        assert!(matches!(err, RateError::Parse(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let source = HttpRateSource::new(&Config {
            api_base_url: format!("http://{}/v6/latest", addr),
            request_timeout: Duration::from_millis(300),
            ..Config::default()
        })
        .unwrap();

        let err = source.fetch_latest("USD").await.unwrap_err();
        assert_eq!(err, RateError::Timeout);
        drop(listener);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = source_for(format!("http://{}/v6/latest", addr))
            .fetch_latest("USD")
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::Network(_) | RateError::Timeout));
    }
}

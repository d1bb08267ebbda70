//! Shared JSON-over-HTTP client for the card and combo databases.

use std::time::Duration;

use judgebot_config::ApiConfig;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Non-2xx status; `message` is the API's own explanation when it gave one
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A base URL plus the headers and timeouts every request carries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    get_timeout: Duration,
    post_timeout: Duration,
    pause_after: Duration,
    error_field: Option<&'static str>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            get_timeout: Duration::from_secs(config.timeout_secs),
            post_timeout: Duration::from_secs(config.post_timeout_secs),
            pause_after: Duration::ZERO,
            error_field: None,
        }
    }

    /// Sleep this long after every successful request.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_after = pause;
        self
    }

    /// Read error explanations from this field of the error body.
    pub fn with_error_field(mut self, field: &'static str) -> Self {
        self.error_field = Some(field);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let request = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.get_timeout);
        self.send(request).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST");

        let request = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.post_timeout);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = self.error_message(status.as_u16(), &body);
            warn!(status = status.as_u16(), message = %message, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = response.json::<T>().await.map_err(ApiError::from_reqwest)?;

        if !self.pause_after.is_zero() {
            tokio::time::sleep(self.pause_after).await;
        }
        Ok(parsed)
    }

    fn error_message(&self, status: u16, body: &str) -> String {
        self.error_field
            .and_then(|field| {
                serde_json::from_str::<serde_json::Value>(body)
                    .ok()?
                    .get(field)?
                    .as_str()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn client(uri: &str) -> ApiClient {
        ApiClient::new(uri, &ApiConfig::default())
    }

    #[tokio::test]
    async fn get_sends_headers_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(query_param("q", "t:goblin"))
            .and(header("Accept", "application/json"))
            .and(header("User-Agent", ApiConfig::default().user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let pong: Pong = client(&server.uri())
            .get_json("/ping", &[("q", "t:goblin".into())])
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo/"))
            .and(body_json(json!({"cards": ["Sol Ring"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let pong: Pong = client(&server.uri())
            .post_json("/echo/", &json!({"cards": ["Sol Ring"]}))
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn error_field_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "object": "error",
                "details": "No cards found matching that name."
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .with_error_field("details")
            .get_json::<Pong>("/cards/named", &[])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "No cards found matching that name.");
    }

    #[tokio::test]
    async fn plain_status_without_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .with_error_field("details")
            .get_json::<Pong>("/x", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).get_json::<Pong>("/x", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}

//! Traffic-controlled HTTP client for one provider.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use serde::Serialize;
use url::Url;

use crate::error::{Result, TrafficError};
use crate::outbound::executor::{self, Attempt, CallOptions};
use crate::resilience::Deadline;
use crate::traffic::{ScopeKey, TrafficController};

/// Async client whose every call goes through the provider's scope.
///
/// Cheap to clone; clones share the controller and the connection pool.
#[derive(Debug, Clone)]
pub struct TrafficClient {
    controller: Arc<TrafficController>,
    scope: ScopeKey,
    base_url: Url,
    http: reqwest::Client,
    attempt_timeout: Duration,
    budget: Option<Duration>,
}

impl TrafficClient {
    /// Client for `provider` rooted at `base_url`.
    pub fn new(controller: Arc<TrafficController>, provider: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            controller,
            scope: ScopeKey::outbound(provider),
            base_url: parse_base_url(base_url)?,
            http: reqwest::Client::new(),
            attempt_timeout: CallOptions::default().attempt_timeout,
            budget: None,
        })
    }

    /// Use a preconfigured reqwest client (proxies, TLS, default headers).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Timeout of each individual attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Total time a logical call may take, retries included.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    pub fn controller(&self) -> &Arc<TrafficController> {
        &self.controller
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::POST, path, Some(encode_json(body)?)).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::PUT, path, Some(encode_json(body)?)).await
    }

    pub async fn patch_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::PATCH, path, Some(encode_json(body)?)).await
    }

    /// Send a request with an optional JSON body.
    ///
    /// Returns the response for 1xx-3xx. A 4xx other than 429 fails with
    /// [`TrafficError::ClientError`] without retrying; 429, 5xx and transport
    /// failures are retried and end in [`TrafficError::UpstreamError`].
    pub async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let url = join(&self.base_url, path)?;
        let options = CallOptions {
            attempt_timeout: self.attempt_timeout,
            deadline: self.budget.map(Deadline::after).unwrap_or_default(),
        };

        executor::execute(&self.controller, &self.scope, options, |timeout| {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .timeout(timeout);
            if let Some(body) = &body {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }

            async move {
                match request.send().await {
                    Ok(response) => Attempt::Response {
                        status: response.status().as_u16(),
                        retry_after: executor::parse_retry_after(response.headers()),
                        response,
                    },
                    Err(e) => Attempt::Transport(e.to_string()),
                }
            }
        })
        .await
    }
}

pub(crate) fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| TrafficError::InvalidRequest(e.to_string()))
}

/// Parse a base URL so that relative paths join beneath its last segment.
pub(crate) fn parse_base_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| TrafficError::InvalidRequest(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(TrafficError::InvalidRequest(format!("not a base URL: {}", base)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| TrafficError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_join_beneath_base() {
        let base = parse_base_url("https://api.example.com/v1").unwrap();
        assert_eq!(
            join(&base, "/chat/completions").unwrap().as_str(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            join(&base, "models?limit=5").unwrap().as_str(),
            "https://api.example.com/v1/models?limit=5"
        );

        let root = parse_base_url("http://127.0.0.1:9000").unwrap();
        assert_eq!(join(&root, "/health").unwrap().as_str(), "http://127.0.0.1:9000/health");
    }

    #[test]
    fn test_bad_base_url_rejected() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(TrafficError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_base_url("mailto:ops@example.com"),
            Err(TrafficError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_client_scope_is_outbound() {
        let controller = Arc::new(TrafficController::default());
        let client = TrafficClient::new(controller, "openai", "https://api.openai.com/v1").unwrap();
        assert_eq!(client.scope().to_string(), "provider:openai");
    }
}

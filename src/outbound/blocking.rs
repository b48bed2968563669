//! Blocking variant of [`TrafficClient`](crate::outbound::TrafficClient).
//!
//! Shares the controller (and so the scopes) with async clients. Must not be
//! called from inside an async task; use `spawn_blocking` there.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::Result;
use crate::outbound::client::{encode_json, join, parse_base_url};
use crate::outbound::executor::{self, Attempt, CallOptions};
use crate::resilience::Deadline;
use crate::traffic::{ScopeKey, TrafficController};

#[derive(Debug, Clone)]
pub struct BlockingTrafficClient {
    controller: Arc<TrafficController>,
    scope: ScopeKey,
    base_url: Url,
    http: reqwest::blocking::Client,
    attempt_timeout: Duration,
    budget: Option<Duration>,
}

impl BlockingTrafficClient {
    pub fn new(controller: Arc<TrafficController>, provider: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            controller,
            scope: ScopeKey::outbound(provider),
            base_url: parse_base_url(base_url)?,
            http: reqwest::blocking::Client::new(),
            attempt_timeout: CallOptions::default().attempt_timeout,
            budget: None,
        })
    }

    pub fn with_http_client(mut self, http: reqwest::blocking::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    pub fn get(&self, path: &str) -> Result<Response> {
        self.send(Method::GET, path, None)
    }

    pub fn delete(&self, path: &str) -> Result<Response> {
        self.send(Method::DELETE, path, None)
    }

    pub fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::POST, path, Some(encode_json(body)?))
    }

    pub fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::PUT, path, Some(encode_json(body)?))
    }

    pub fn patch_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::PATCH, path, Some(encode_json(body)?))
    }

    pub fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let url = join(&self.base_url, path)?;
        let options = CallOptions {
            attempt_timeout: self.attempt_timeout,
            deadline: self.budget.map(Deadline::after).unwrap_or_default(),
        };

        executor::execute_blocking(&self.controller, &self.scope, options, |timeout| {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .timeout(timeout);
            if let Some(body) = &body {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }

            match request.send() {
                Ok(response) => Attempt::Response {
                    status: response.status().as_u16(),
                    retry_after: executor::parse_retry_after(response.headers()),
                    response,
                },
                Err(e) => Attempt::Transport(e.to_string()),
            }
        })
    }
}

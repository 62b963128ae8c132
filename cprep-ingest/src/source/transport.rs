//! Raw transport for GraphQL POST requests
//!
//! A transport performs exactly one HTTP exchange; retrying and response
//! decoding live in [`super::retry`].

use async_trait::async_trait;
use cprep_common::config::{get_user_agent, SourceConfig};
use cprep_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Failure before any HTTP status was received
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Timeouts and connection failures are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// One-shot POST of a JSON payload
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, payload: &Value) -> std::result::Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport for the platform GraphQL endpoint
pub struct HttpTransport {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build the client with session credentials and per-request timeouts
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, header_value(base_url)?);
        headers.insert(ORIGIN, header_value(base_url)?);

        if let Some(csrf) = &config.csrf_token {
            headers.insert(HeaderName::from_static("x-csrftoken"), header_value(csrf)?);
        }

        let mut cookies = Vec::new();
        if let Some(session) = &config.session_token {
            cookies.push(format!("LEETCODE_SESSION={}", session));
        }
        if let Some(csrf) = &config.csrf_token {
            cookies.push(format!("csrftoken={}", csrf));
        }
        if !cookies.is_empty() {
            headers.insert(COOKIE, header_value(&cookies.join("; "))?);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/graphql/", base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Config(format!("invalid header value: {}", e)))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, payload: &Value) -> std::result::Result<TransportResponse, TransportError> {
        tracing::debug!(endpoint = %self.endpoint, "POST GraphQL request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

//! Search transport
//!
//! The seam between request compilation and the network. [`HttpTransport`]
//! posts requests to a live backend; [`StaticTransport`] answers every
//! request with a canned response.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use crate::config::{BackendConfig, PathStyle};
use crate::search::request::SearchRequest;
use crate::search::response::SearchResponse;

/// Sends compiled requests to a search backend
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Send one search request; never retried
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Human-readable backend location for logs and health output
    fn endpoint(&self) -> String;
}

/// HTTP transport using reqwest
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    path_style: PathStyle,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    /// Create a transport from backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            path_style: config.path_style,
            credentials: config
                .username
                .clone()
                .map(|username| (username, config.password.clone())),
        })
    }

    /// URL a request is posted to
    pub fn search_url(&self, request: &SearchRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(request.path_segments(self.path_style));
        }

        if let Some(keep_alive) = request.scroll() {
            url.query_pairs_mut().append_pair("scroll", keep_alive);
        }

        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, password.as_ref()),
            None => builder,
        }
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
        let url = self.search_url(request)?;
        tracing::debug!(%url, "sending search request");

        let response = self
            .authorize(self.client.post(url))
            .json(&request.body())
            .send()
            .await
            .map_err(classify)?;

        if response.status().is_success() {
            response
                .json::<SearchResponse>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(TransportError::Backend {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// The backend answers a GET on its base URL
    async fn ping(&self) -> Result<(), TransportError> {
        let response = self
            .authorize(self.client.get(self.base_url.clone()))
            .send()
            .await
            .map_err(classify)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Unavailable)
        }
    }

    fn endpoint(&self) -> String {
        self.base_url.to_string()
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Unavailable
    } else {
        TransportError::Request(e)
    }
}

/// Transport answering every request with the same response body
///
/// Records each request body it receives.
pub struct StaticTransport {
    response: Value,
    requests: Mutex<Vec<Value>>,
}

impl StaticTransport {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchTransport for StaticTransport {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.body());
        }

        serde_json::from_value(self.response.clone())
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn endpoint(&self) -> String {
        "static".to_string()
    }
}

/// Errors that can occur when talking to the search backend
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Search backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

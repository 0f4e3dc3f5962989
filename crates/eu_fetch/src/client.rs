use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use eu_core::{ArticleRecord, Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What the API gateway answers with when the search backend is too slow.
const GATEWAY_TIMEOUT_MESSAGE: &str = "Endpoint request timed out";

#[derive(Clone)]
pub struct SearchConfig {
    pub url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub include_highlights: bool,
}

impl SearchConfig {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self {
            url,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            include_highlights: true,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("include_highlights", &self.include_highlights)
            .finish()
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query_text: &'a str,
    result_size: usize,
    include_highlights: bool,
}

#[async_trait]
pub trait SearchApi: Send + Sync {
    /// One request, no retries. Rows come back without their `query` set.
    async fn search(&self, query: &str, result_size: usize) -> Result<Vec<ArticleRecord>>;
}

pub struct SearchClient {
    client: Client,
    config: SearchConfig,
}

impl fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchClient")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

#[async_trait]
impl SearchApi for SearchClient {
    async fn search(&self, query: &str, result_size: usize) -> Result<Vec<ArticleRecord>> {
        let payload = SearchRequest {
            query_text: query,
            result_size,
            include_highlights: self.config.include_highlights,
        };

        let mut request = self
            .client
            .post(self.config.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }

        tracing::debug!(query, result_size, url = %self.config.url, "sending search request");
        let response = request.send().await.map_err(Error::from_request)?;
        let status_error = response.error_for_status_ref().err();
        let body = response.text().await.map_err(Error::from_request)?;

        if let Some(err) = status_error {
            if is_gateway_timeout(&body) {
                return Err(Error::Timeout);
            }
            return Err(Error::Transport(err));
        }

        parse_search_body(&body)
    }
}

fn is_gateway_timeout(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(|m| m == GATEWAY_TIMEOUT_MESSAGE))
        .unwrap_or(false)
}

/// Turns a search response body into rows.
pub fn parse_search_body(body: &str) -> Result<Vec<ArticleRecord>> {
    let payload: Value = serde_json::from_str(body).map_err(|e| Error::MalformedBody(e.to_string()))?;

    match payload.get("results") {
        Some(Value::Array(items)) => items
            .iter()
            .cloned()
            .map(|item| {
                serde_json::from_value::<ArticleRecord>(item).map_err(|e| Error::MalformedBody(e.to_string()))
            })
            .collect(),
        Some(other) => Err(Error::MalformedBody(format!("'results' is not a list: {}", other))),
        _ if is_gateway_timeout(body) => Err(Error::Timeout),
        _ => Err(Error::MissingField {
            field: "results",
            payload,
        }),
    }
}

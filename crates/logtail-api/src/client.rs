//! HTTP fetcher for the log query endpoint

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::FetchError;
use crate::query::{LogPage, LogQuery, parse_response};
use crate::resources::ResourceRegistry;

/// Anything that can answer a single log query
///
/// The session engine is generic over this so tests can substitute an
/// in-memory source for the HTTP client.
pub trait LogSource: Send + Sync + 'static {
    fn fetch(&self, query: &LogQuery) -> impl Future<Output = Result<LogPage, FetchError>> + Send;
}

/// Endpoint and transport settings
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub logs_path: String,
    /// Whole-request deadline for a single log query, body included
    pub request_timeout: Duration,
    /// Connect deadline; the only bound on pushed streams, which stay open
    /// for as long as the server keeps sending
    pub connect_timeout: Duration,
    pub auth_header: String,
    pub workspace_header: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.blaxel.ai".to_string(),
            logs_path: "/v0/observability/logs".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            auth_header: "X-Blaxel-Authorization".to_string(),
            workspace_header: "X-Blaxel-Workspace".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Credentials loaded by the caller; this crate never reads them from disk
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    pub workspace: Option<String>,
}

impl Credentials {
    /// Bearer value for the authorization header; an API key takes precedence
    pub fn authorization(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .or(self.access_token.as_deref())
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {}", t))
    }
}

/// Log query client
#[derive(Clone)]
pub struct LogApiClient {
    http: reqwest::Client,
    /// No total deadline, so long-lived bodies are not cut off
    stream_http: reqwest::Client,
    config: ClientConfig,
    credentials: Credentials,
    registry: ResourceRegistry,
}

impl LogApiClient {
    /// Build a client with its own HTTP connection pools
    pub fn new(
        config: ClientConfig,
        credentials: Credentials,
        registry: ResourceRegistry,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        let stream_http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            stream_http,
            config,
            credentials,
            registry,
        })
    }

    /// Build a client around an existing HTTP client, used for both queries
    /// and streams
    pub fn with_http_client(
        http: reqwest::Client,
        config: ClientConfig,
        credentials: Credentials,
        registry: ResourceRegistry,
    ) -> Self {
        Self {
            stream_http: http.clone(),
            http,
            config,
            credentials,
            registry,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        let raw = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|source| FetchError::InvalidUrl { url: raw, source })
    }

    /// Full URL (with query string) for a log query
    pub fn query_url(&self, query: &LogQuery) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&self.config.logs_path)?;
        url.query_pairs_mut()
            .extend_pairs(query.query_pairs(&self.registry));
        Ok(url)
    }

    fn auth_headers(&self, workspace: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let mut insert = |name: &str, value: &str| {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        };

        if let Some(auth) = self.credentials.authorization() {
            insert(&self.config.auth_header, &auth);
        }
        let workspace = if workspace.is_empty() {
            self.credentials.workspace.as_deref().unwrap_or_default()
        } else {
            workspace
        };
        if !workspace.is_empty() {
            insert(&self.config.workspace_header, workspace);
        }
        headers
    }

    /// Run one query and return the queried resource's page
    pub async fn fetch_page(&self, query: &LogQuery) -> Result<LogPage, FetchError> {
        let url = self.query_url(query)?;
        tracing::debug!(
            resource = %query.resource,
            offset = query.offset,
            start = %query.window.start(),
            end = %query.window.end(),
            "querying logs"
        );

        let response = self
            .http
            .get(url)
            .headers(self.auth_headers(&query.resource.workspace))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body, &query.resource.name)
    }

    /// Open a streaming GET (used for push-style build logs)
    pub async fn open_stream(
        &self,
        path: &str,
        workspace: &str,
    ) -> Result<reqwest::Response, FetchError> {
        let url = self.endpoint(path)?;
        let response = self
            .stream_http
            .get(url)
            .headers(self.auth_headers(workspace))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl LogSource for LogApiClient {
    fn fetch(&self, query: &LogQuery) -> impl Future<Output = Result<LogPage, FetchError>> + Send {
        self.fetch_page(query)
    }
}

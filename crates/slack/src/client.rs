//! Minimal Slack Web API client for `chat.postMessage` and `chat.update`.

use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::{StatusCode, header::HeaderMap},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::info,
};

use crate::{
    blocks::Block,
    error::{ApiError, Error, Operation, Result},
};

/// Production Web API base URL.
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Wait used when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// `chat.postMessage` arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    pub unfurl_links: bool,
    pub unfurl_media: bool,
}

/// `chat.update` arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateMessage {
    pub channel: String,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
}

/// One network call per method; both return the message timestamp.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(&self, message: &PostMessage) -> std::result::Result<String, ApiError>;

    async fn update_message(
        &self,
        message: &UpdateMessage,
    ) -> std::result::Result<String, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// [`SlackApi`] over HTTPS with a bot token.
pub struct HttpSlackClient {
    http: reqwest::Client,
    base_url: String,
    token: Secret<String>,
    debug: bool,
}

impl std::fmt::Debug for HttpSlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSlackClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl HttpSlackClient {
    pub fn new(token: Secret<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("slack-resource/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            http,
            base_url: DEFAULT_API_URL.to_string(),
            token,
            debug: false,
        })
    }

    /// Point at another Web API root (Enterprise Grid proxy, test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Log request payloads and raw responses.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    async fn call<B: Serialize + Sync>(
        &self,
        operation: Operation,
        body: &B,
    ) -> std::result::Result<String, ApiError> {
        let method = operation.method();
        let url = format!("{}/{method}", self.base_url);

        if self.debug {
            let payload = serde_json::to_string(body).unwrap_or_default();
            info!(method, %payload, "slack request");
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited {
                retry_after: retry_after(&headers),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Server { status });
        }

        let raw = response.text().await?;
        if self.debug {
            info!(method, %status, response = %raw, "slack response");
        }

        let parsed: ApiResponse = serde_json::from_str(&raw).map_err(ApiError::Decode)?;
        match parsed {
            ApiResponse { ok: true, ts: Some(ts), .. } if !ts.is_empty() => Ok(ts),
            ApiResponse { ok: true, .. } => Err(ApiError::MissingTimestamp),
            ApiResponse { error, .. } => match error.as_deref() {
                Some("ratelimited") => Err(ApiError::RateLimited {
                    retry_after: retry_after(&headers),
                }),
                _ => Err(ApiError::Api {
                    error: error.unwrap_or_else(|| "unknown_error".to_string()),
                }),
            },
        }
    }
}

#[async_trait]
impl SlackApi for HttpSlackClient {
    async fn post_message(&self, message: &PostMessage) -> std::result::Result<String, ApiError> {
        self.call(Operation::Send, message).await
    }

    async fn update_message(
        &self,
        message: &UpdateMessage,
    ) -> std::result::Result<String, ApiError> {
        self.call(Operation::Update, message).await
    }
}

/// `Retry-After` is whole seconds.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

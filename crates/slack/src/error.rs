use std::time::Duration;

/// Crate-wide result type for Slack delivery.
pub type Result<T> = std::result::Result<T, Error>;

/// The two Slack operations a delivery can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Update,
}

impl Operation {
    /// Web API method name.
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            Self::Send => "chat.postMessage",
            Self::Update => "chat.update",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// A single failed Web API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP 429 or a `ratelimited` error body.
    #[error("slack rate limit hit, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Non-2xx HTTP status other than 429.
    #[error("slack server error: {status}")]
    Server { status: reqwest::StatusCode },

    /// `"ok": false` with Slack's error code, e.g. `channel_not_found`.
    #[error("{error}")]
    Api { error: String },

    /// Successful response without a message timestamp.
    #[error("slack response did not include a message timestamp")]
    MissingTimestamp,

    #[error("slack request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("couldn't decode slack response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Wait Slack asked for before the next call, if rate limited.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Transient server-side fault, recognised by its description.
    #[must_use]
    pub fn is_server_fault(&self) -> bool {
        self.to_string()
            .to_lowercase()
            .contains("internal server error")
    }
}

/// Errors surfaced to the caller of a delivery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Block Kit content is not a valid list of blocks.
    #[error("couldn't parse blocks: {message}")]
    BodyParse { message: String },

    /// Every attempt failed with a retryable fault.
    #[error("couldn't {operation} message - hit max retries")]
    MaxRetries { operation: Operation },

    /// Non-retryable Web API failure, passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("couldn't build slack client: {0}")]
    Client(#[source] reqwest::Error),
}

impl Error {
    #[must_use]
    pub fn body_parse(message: impl std::fmt::Display) -> Self {
        Self::BodyParse {
            message: message.to_string(),
        }
    }
}

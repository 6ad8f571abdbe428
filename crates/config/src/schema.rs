//! Request and response envelopes exchanged with the pipeline orchestrator.
//!
//! Every optional field defaults to empty so partially filled `source` /
//! `params` objects decode cleanly; emptiness is what the resolver checks.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Resource-level configuration, shared by every step using the resource.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Default channel ID or name.
    pub channel: String,

    /// Bot user OAuth token (`xoxb-...`).
    pub bot_token: Secret<String>,

    /// Maximum send attempts. Zero or negative means "unset".
    pub max_retries: i64,

    /// Log Slack request and response payloads.
    pub debug: bool,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            channel: String::new(),
            bot_token: Secret::new(String::new()),
            max_retries: 0,
            debug: false,
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("channel", &self.channel)
            .field("bot_token", &"[REDACTED]")
            .field("max_retries", &self.max_retries)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Source {
    pub fn has_bot_token(&self) -> bool {
        !self.bot_token.expose_secret().is_empty()
    }
}

/// Per-step overrides supplied in a `put`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Block Kit JSON, inline.
    pub blocks: String,

    /// File holding Block Kit JSON, relative to the step's working directory.
    pub blocks_file: String,

    /// Timestamp of an existing message to update in place.
    pub timestamp: String,

    /// Timestamp of the parent message to reply under.
    pub thread_ts: String,

    /// Plain message text, also used as the notification fallback for blocks.
    pub text: String,

    /// Overrides `source.channel`.
    pub channel: String,
}

/// Payload for the `out` script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PutRequest {
    pub source: Source,
    pub params: Params,
}

/// Payload for the `in` script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetRequest {
    pub source: Source,
    pub params: Params,
    pub version: Option<Version>,
}

/// Payload for the `check` script. Nothing in it affects the result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckRequest {
    pub source: Source,
    pub version: Option<Version>,
}

/// A message timestamp identifying one state of the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub timestamp: String,
}

impl Version {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
        }
    }
}

/// Response printed by `in` and `out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: Version,
}

impl From<Version> for VersionResponse {
    fn from(version: Version) -> Self {
        Self { version }
    }
}

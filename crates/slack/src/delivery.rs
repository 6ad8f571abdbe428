//! Turn an [`EffectiveConfig`] into exactly one Slack message post or update.

use std::time::Duration;

use {
    slack_resource_config::{Action, EffectiveConfig, Version},
    tracing::{debug, info},
};

use crate::{
    blocks::{Block, parse_blocks},
    client::{PostMessage, SlackApi, UpdateMessage},
    error::{Operation, Result},
    retry::{RetryPolicy, SERVER_ERROR_BACKOFF, with_retries},
};

/// Runs deliveries against a [`SlackApi`].
pub struct Executor<'a> {
    api: &'a dyn SlackApi,
    server_error_backoff: Duration,
}

impl<'a> Executor<'a> {
    pub fn new(api: &'a dyn SlackApi) -> Self {
        Self {
            api,
            server_error_backoff: SERVER_ERROR_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_server_error_backoff(mut self, backoff: Duration) -> Self {
        self.server_error_backoff = backoff;
        self
    }

    /// Post or update the message and return its timestamp as the new version.
    ///
    /// Blocks are parsed up front, so invalid Block Kit JSON fails before any
    /// request is made.
    pub async fn execute(&self, config: &EffectiveConfig) -> Result<Version> {
        let blocks = if config.blocks.is_empty() {
            None
        } else {
            Some(parse_blocks(&config.blocks)?)
        };
        let policy = RetryPolicy::new(config.max_retries)
            .with_server_error_backoff(self.server_error_backoff);

        let (operation, ts) = match config.action() {
            Action::Update { ts } => {
                let message = update_message(config, ts, blocks);
                debug!(channel = %message.channel, ts, "updating slack message");
                let ts = with_retries(policy, Operation::Update, || {
                    self.api.update_message(&message)
                })
                .await?;
                (Operation::Update, ts)
            },
            Action::Post { thread_ts } => {
                let message = post_message(config, thread_ts, blocks);
                debug!(
                    channel = %message.channel,
                    thread_ts = thread_ts.unwrap_or_default(),
                    "posting slack message"
                );
                let ts = with_retries(policy, Operation::Send, || {
                    self.api.post_message(&message)
                })
                .await?;
                (Operation::Send, ts)
            },
        };

        info!(channel = %config.channel, %ts, %operation, "slack message delivered");
        Ok(Version::new(ts))
    }
}

/// Link previews are always off for posted messages.
fn post_message(
    config: &EffectiveConfig,
    thread_ts: Option<&str>,
    blocks: Option<Vec<Block>>,
) -> PostMessage {
    PostMessage {
        channel: config.channel.clone(),
        text: non_empty(&config.text),
        blocks,
        thread_ts: thread_ts.map(str::to_string),
        unfurl_links: false,
        unfurl_media: false,
    }
}

fn update_message(config: &EffectiveConfig, ts: &str, blocks: Option<Vec<Block>>) -> UpdateMessage {
    UpdateMessage {
        channel: config.channel.clone(),
        ts: ts.to_string(),
        text: non_empty(&config.text),
        blocks,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

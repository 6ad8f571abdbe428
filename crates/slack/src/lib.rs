//! Slack delivery for the resource's `out` step.
//!
//! Posts or updates one message through the Web API, retrying rate limits
//! and internal server errors within the configured attempt budget.

pub mod blocks;
pub mod client;
pub mod delivery;
pub mod error;
pub mod retry;

pub use {
    blocks::{Block, parse_blocks},
    client::{DEFAULT_API_URL, HttpSlackClient, PostMessage, SlackApi, UpdateMessage},
    delivery::Executor,
    error::{ApiError, Error, Operation, Result},
    retry::{RetryPolicy, SERVER_ERROR_BACKOFF, with_retries},
};

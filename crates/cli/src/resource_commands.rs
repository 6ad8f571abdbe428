//! `check`, `in` and `out` handlers.
//!
//! Each reads one JSON request from `input` and, only once everything has
//! succeeded, writes one JSON response to `output`.

use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
};

use {
    anyhow::{Context, Result},
    serde::{Serialize, de::DeserializeOwned},
    slack_resource_config::{
        CheckRequest, Error as ConfigError, GetRequest, PutRequest, Resolver, Version,
        VersionResponse, prepare,
    },
    slack_resource_slack::{Executor, HttpSlackClient},
    tracing::debug,
};

/// File the `in` step writes the message timestamp to.
pub const VERSION_FILE: &str = "ts";

/// Settings for `out` that come from the process rather than the request.
#[derive(Debug, Clone)]
pub struct PutOptions {
    /// Directory `blocks_file` paths are relative to.
    pub work_dir: PathBuf,
    /// Slack Web API base URL.
    pub api_url: String,
}

/// Messages are only produced by `out`, so there is never a new version.
///
/// The request is only inspected for logging; unreadable input still
/// reports no versions.
pub fn check(mut input: impl Read, output: impl Write) -> Result<()> {
    let mut raw = String::new();
    if let Err(e) = input.read_to_string(&mut raw) {
        debug!(error = %e, "couldn't read check request");
    } else if !raw.trim().is_empty() {
        match serde_json::from_str::<CheckRequest>(&raw) {
            Ok(request) => debug!(current = ?request.version, "check reports no new versions"),
            Err(e) => debug!(error = %e, "ignoring undecodable check request"),
        }
    }

    emit(output, &Vec::<Version>::new())
}

/// Record the requested version's timestamp under `destination`.
pub fn get(input: impl Read, output: impl Write, destination: &Path) -> Result<()> {
    let request: GetRequest = decode(input)?;
    let version = request.version.unwrap_or_default();

    write_version(destination, &version).with_context(|| {
        format!(
            "error writing timestamp to {}",
            destination.join(VERSION_FILE).display()
        )
    })?;

    emit(output, &VersionResponse::from(version))
}

/// Post or update a Slack message and report its timestamp.
pub async fn put(input: impl Read, output: impl Write, options: &PutOptions) -> Result<()> {
    let request: PutRequest = decode(input)?;

    let resolver = Resolver::new(&options.work_dir);
    let config = prepare(&request, &resolver).map_err(|e| {
        let stage = match e {
            ConfigError::Validation(_) => "error whilst validating options",
            _ => "error whilst setting config",
        };
        anyhow::Error::new(e).context(stage)
    })?;
    debug!(?config, work_dir = %resolver.work_dir().display(), "resolved configuration");

    let client = HttpSlackClient::new(config.bot_token.clone())?
        .with_base_url(&options.api_url)
        .with_debug(config.debug);
    let version = Executor::new(&client)
        .execute(&config)
        .await
        .context("error whilst sending message to slack")?;

    emit(output, &VersionResponse::from(version))
}

/// Write the timestamp verbatim, creating `destination` if needed.
pub fn write_version(destination: &Path, version: &Version) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    std::fs::write(destination.join(VERSION_FILE), &version.timestamp)
}

fn decode<T: DeserializeOwned>(input: impl Read) -> Result<T> {
    serde_json::from_reader(input).context("couldn't decode stdin")
}

fn emit(mut output: impl Write, response: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut output, response).context("couldn't encode response")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

mod resource_commands;

use std::{
    ffi::OsString,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use {
    clap::{Parser, Subcommand},
    slack_resource_config::DEFAULT_WORK_DIR,
    slack_resource_slack::DEFAULT_API_URL,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::resource_commands::PutOptions;

/// Script names Concourse executes under `/opt/resource`.
const RESOURCE_SCRIPTS: &[&str] = &["check", "in", "out"];

#[derive(Parser)]
#[command(
    name = "slack-resource",
    about = "Concourse resource that posts and updates Slack messages",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "SLACK_RESOURCE_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Slack Web API base URL.
    #[arg(long, global = true, env = "SLACK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Report new versions. Always an empty list.
    Check,
    /// Write the requested version's timestamp to `<destination>/ts`.
    #[command(name = "in", alias = "get")]
    In { destination: PathBuf },
    /// Post or update a Slack message.
    #[command(name = "out", alias = "put")]
    Out {
        /// Directory `blocks_file` is resolved against.
        #[arg(default_value = DEFAULT_WORK_DIR)]
        source_dir: PathBuf,
    },
}

/// When installed as `/opt/resource/{check,in,out}` links, treat the
/// invoked name as the subcommand.
fn resource_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    let script = args
        .first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| RESOURCE_SCRIPTS.contains(name))
        .map(OsString::from);
    if let Some(script) = script {
        args.insert(1, script);
    }
    args
}

/// Logs go to stderr; stdout carries the protocol response.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(resource_args(std::env::args_os()));

    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "slack-resource starting");

    let (stdin, stdout) = (std::io::stdin(), std::io::stdout());
    match cli.command {
        Commands::Check => resource_commands::check(stdin, stdout),
        Commands::In { destination } => resource_commands::get(stdin, stdout, &destination),
        Commands::Out { source_dir } => {
            let options = PutOptions {
                work_dir: source_dir,
                api_url: cli.api_url,
            };
            resource_commands::put(stdin, stdout, &options).await
        },
    }
}

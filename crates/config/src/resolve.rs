//! Merge `source` and `params` into the configuration a delivery runs with.
//!
//! Each field has its own precedence rule in a small helper below, so the
//! override behaviour can be tested one rule at a time.

use std::path::{Component, Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use crate::{
    error::{Error, Result, ValidationError},
    interpolate::interpolate_with,
    schema::{Params, PutRequest, Source},
};

/// Directory Concourse mounts the `put` step's inputs under.
pub const DEFAULT_WORK_DIR: &str = "/tmp/build/put";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Capabilities the resolver needs from its surroundings: where relative
/// files live and how variables are looked up.
pub struct Resolver {
    work_dir: PathBuf,
    lookup: Lookup,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DIR)
    }
}

impl Resolver {
    /// Resolver reading files under `work_dir` and variables from the
    /// process environment.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            lookup: Box::new(|name: &str| std::env::var(name).ok()),
        }
    }

    /// Replace the variable lookup, e.g. with a fixed map in tests.
    #[must_use]
    pub fn with_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `name` resolved under `work_dir`. Leading roots are dropped so an
    /// absolute name still lands inside it; `..` is refused.
    fn confined_path(&self, name: &str) -> std::io::Result<PathBuf> {
        let mut path = self.work_dir.clone();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {},
                Component::ParentDir => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path escapes the working directory",
                    ));
                },
            }
        }
        Ok(path)
    }

    fn interpolate(&self, text: &str) -> String {
        interpolate_with(text, |name| (self.lookup)(name))
    }

    fn read_blocks_file(&self, name: &str) -> Result<String> {
        let path = self
            .confined_path(name)
            .map_err(|e| Error::file_read(name, e))?;
        debug!(path = %path.display(), "reading blocks file");
        std::fs::read_to_string(&path).map_err(|e| Error::file_read(name, e))
    }
}

/// Which Slack call a configuration turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// `chat.postMessage`, optionally as a reply under `thread_ts`.
    Post { thread_ts: Option<&'a str> },
    /// `chat.update` of the message at `ts`.
    Update { ts: &'a str },
}

/// The merged, validated and interpolated settings for one delivery.
#[derive(Clone)]
pub struct EffectiveConfig {
    pub channel: String,
    pub bot_token: Secret<String>,
    /// Always at least 1.
    pub max_retries: u32,
    /// Interpolated Block Kit JSON, empty when none was given.
    pub blocks: String,
    /// Interpolated message text, empty when none was given.
    pub text: String,
    /// Existing message to update. Never set together with `thread_ts`.
    pub timestamp: String,
    pub thread_ts: String,
    pub debug: bool,
}

impl std::fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("channel", &self.channel)
            .field("bot_token", &"[REDACTED]")
            .field("max_retries", &self.max_retries)
            .field("timestamp", &self.timestamp)
            .field("thread_ts", &self.thread_ts)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl EffectiveConfig {
    /// Update when a message timestamp was supplied, post otherwise.
    pub fn action(&self) -> Action<'_> {
        if self.timestamp.is_empty() {
            Action::Post {
                thread_ts: non_empty(&self.thread_ts),
            }
        } else {
            Action::Update {
                ts: &self.timestamp,
            }
        }
    }

    pub fn bot_token(&self) -> &str {
        self.bot_token.expose_secret()
    }
}

/// Reject field combinations that can never be delivered.
pub fn validate(request: &PutRequest) -> std::result::Result<(), ValidationError> {
    let (source, params) = (&request.source, &request.params);

    if !source.has_bot_token() {
        return Err(ValidationError::MissingCredential);
    }
    if source.channel.is_empty() && params.channel.is_empty() {
        return Err(ValidationError::MissingChannel);
    }
    if params.blocks.is_empty() && params.blocks_file.is_empty() && params.text.is_empty() {
        return Err(ValidationError::MissingContent);
    }
    if !params.timestamp.is_empty() && !params.thread_ts.is_empty() {
        return Err(ValidationError::ConflictingTimestamps);
    }

    Ok(())
}

/// Merge `source` and `params` into an [`EffectiveConfig`].
///
/// Expects a request that already passed [`validate`]; see [`prepare`].
pub fn resolve(request: &PutRequest, resolver: &Resolver) -> Result<EffectiveConfig> {
    let (source, params) = (&request.source, &request.params);

    let blocks = match raw_blocks(params, resolver)? {
        raw if raw.is_empty() => raw,
        raw => resolver.interpolate(&raw),
    };
    let text = if params.text.is_empty() {
        String::new()
    } else {
        resolver.interpolate(&params.text)
    };

    Ok(EffectiveConfig {
        channel: effective_channel(source, params).to_string(),
        bot_token: source.bot_token.clone(),
        max_retries: effective_max_retries(source.max_retries),
        blocks,
        text,
        timestamp: params.timestamp.clone(),
        thread_ts: params.thread_ts.clone(),
        debug: source.debug,
    })
}

/// Validate, then resolve.
pub fn prepare(request: &PutRequest, resolver: &Resolver) -> Result<EffectiveConfig> {
    validate(request)?;
    resolve(request, resolver)
}

/// `params.channel` wins over `source.channel`.
fn effective_channel<'a>(source: &'a Source, params: &'a Params) -> &'a str {
    if params.channel.is_empty() {
        &source.channel
    } else {
        &params.channel
    }
}

/// Unset or non-positive retry counts mean a single attempt.
fn effective_max_retries(configured: i64) -> u32 {
    if configured <= 0 {
        1
    } else {
        u32::try_from(configured).unwrap_or(u32::MAX)
    }
}

/// `blocks_file` wins over inline `blocks`.
fn raw_blocks(params: &Params, resolver: &Resolver) -> Result<String> {
    if !params.blocks_file.is_empty() {
        resolver.read_blocks_file(&params.blocks_file)
    } else {
        Ok(params.blocks.clone())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn request(channel: &str, token: &str) -> PutRequest {
        PutRequest {
            source: Source {
                channel: channel.into(),
                bot_token: Secret::new(token.into()),
                ..Default::default()
            },
            params: Params {
                text: "hello".into(),
                ..Default::default()
            },
        }
    }

    fn fixed_env(name: &str) -> Option<String> {
        match name {
            "BUILD_PIPELINE_NAME" => Some("deploy".to_string()),
            _ => None,
        }
    }

    fn resolver_in(dir: &Path) -> Resolver {
        Resolver::new(dir).with_lookup(fixed_env)
    }

    #[test]
    fn valid_request_passes() {
        assert_eq!(validate(&request("C1", "xoxb")), Ok(()));
    }

    #[test]
    fn empty_token_is_missing_credential_regardless_of_other_fields() {
        let mut req = request("", "");
        req.params.text.clear();
        req.params.timestamp = "1".into();
        req.params.thread_ts = "2".into();
        assert_eq!(validate(&req), Err(ValidationError::MissingCredential));
    }

    #[test]
    fn params_channel_satisfies_channel_check() {
        let mut req = request("", "xoxb");
        assert_eq!(validate(&req), Err(ValidationError::MissingChannel));
        req.params.channel = "C2".into();
        assert_eq!(validate(&req), Ok(()));
    }

    #[rstest]
    #[case("", "", "", Err(ValidationError::MissingContent))]
    #[case("[]", "", "", Ok(()))]
    #[case("", "blocks.json", "", Ok(()))]
    #[case("", "", "text", Ok(()))]
    fn content_check(
        #[case] blocks: &str,
        #[case] blocks_file: &str,
        #[case] text: &str,
        #[case] expected: std::result::Result<(), ValidationError>,
    ) {
        let mut req = request("C1", "xoxb");
        req.params.blocks = blocks.into();
        req.params.blocks_file = blocks_file.into();
        req.params.text = text.into();
        assert_eq!(validate(&req), expected);
    }

    #[test]
    fn timestamp_and_thread_ts_conflict() {
        let mut req = request("C1", "xoxb");
        req.params.timestamp = "1700000000.000100".into();
        req.params.thread_ts = "1700000000.000200".into();
        let err = validate(&req).unwrap_err();
        assert_eq!(err, ValidationError::ConflictingTimestamps);
        assert!(err.to_string().contains("thread timestamp"));
    }

    #[test]
    fn params_channel_overrides_source() {
        let mut req = request("C-source", "xoxb");
        assert_eq!(effective_channel(&req.source, &req.params), "C-source");
        req.params.channel = "C-params".into();
        assert_eq!(effective_channel(&req.source, &req.params), "C-params");
    }

    #[rstest]
    #[case(0, 1)]
    #[case(-4, 1)]
    #[case(1, 1)]
    #[case(5, 5)]
    #[case(i64::MAX, u32::MAX)]
    fn max_retries_floor(#[case] configured: i64, #[case] expected: u32) {
        assert_eq!(effective_max_retries(configured), expected);
    }

    #[test]
    fn resolve_interpolates_text_and_copies_identifiers() {
        let mut req = request("C1", "xoxb");
        req.params.text = "{{ $BUILD_PIPELINE_NAME }} finished".into();
        req.params.thread_ts = "{{ BUILD_PIPELINE_NAME }}".into();
        req.source.debug = true;

        let cfg = resolve(&req, &Resolver::default().with_lookup(fixed_env)).unwrap();
        assert_eq!(cfg.text, "deploy finished");
        assert_eq!(cfg.thread_ts, "{{ BUILD_PIPELINE_NAME }}");
        assert_eq!(cfg.max_retries, 1);
        assert_eq!(cfg.bot_token(), "xoxb");
        assert!(cfg.debug);
        assert!(cfg.blocks.is_empty());
    }

    #[test]
    fn inline_blocks_are_interpolated() {
        let mut req = request("C1", "xoxb");
        req.params.blocks = r#"[{"type":"header","text":"{{BUILD_PIPELINE_NAME}}"}]"#.into();
        let cfg = resolve(&req, &Resolver::default().with_lookup(fixed_env)).unwrap();
        assert_eq!(cfg.blocks, r#"[{"type":"header","text":"deploy"}]"#);
    }

    #[test]
    fn blocks_file_wins_over_inline_blocks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("message")).unwrap();
        std::fs::write(
            dir.path().join("message/blocks.json"),
            r#"[{"type":"section","text":"{{ BUILD_PIPELINE_NAME }}"}]"#,
        )
        .unwrap();

        let mut req = request("C1", "xoxb");
        req.params.blocks = "[]".into();
        req.params.blocks_file = "message/blocks.json".into();

        let cfg = resolve(&req, &resolver_in(dir.path())).unwrap();
        assert_eq!(cfg.blocks, r#"[{"type":"section","text":"deploy"}]"#);
    }

    #[test]
    fn missing_blocks_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request("C1", "xoxb");
        req.params.blocks_file = "nope.json".into();

        let err = resolve(&req, &resolver_in(dir.path())).unwrap_err();
        match &err {
            Error::FileRead { name, source } => {
                assert_eq!(name, "nope.json");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("'nope.json'"));
    }

    #[test]
    fn absolute_blocks_file_stays_inside_work_dir() {
        let work = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let outside = elsewhere.path().join("blocks.json");
        std::fs::write(&outside, "OUTSIDE").unwrap();

        let inside = work.path().join(outside.strip_prefix("/").unwrap());
        std::fs::create_dir_all(inside.parent().unwrap()).unwrap();
        std::fs::write(&inside, "INSIDE").unwrap();

        let mut req = request("C1", "xoxb");
        req.params.blocks_file = outside.to_str().unwrap().into();

        let cfg = resolve(&req, &resolver_in(work.path())).unwrap();
        assert_eq!(cfg.blocks, "INSIDE");
    }

    #[test]
    fn absolute_blocks_file_outside_work_dir_is_not_read() {
        let work = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let outside = elsewhere.path().join("blocks.json");
        std::fs::write(&outside, "OUTSIDE").unwrap();

        let mut req = request("C1", "xoxb");
        req.params.blocks_file = outside.to_str().unwrap().into();

        let err = resolve(&req, &resolver_in(work.path())).unwrap_err();
        assert!(matches!(&err, Error::FileRead { source, .. }
            if source.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn parent_dir_in_blocks_file_is_refused() {
        let work = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(work.path().join("repo")).unwrap();
        std::fs::write(work.path().join("secret.json"), "[]").unwrap();

        let mut req = request("C1", "xoxb");
        req.params.blocks_file = "repo/../../secret.json".into();

        let err = resolve(&req, &resolver_in(&work.path().join("repo"))).unwrap_err();
        match &err {
            Error::FileRead { name, source } => {
                assert_eq!(name, "repo/../../secret.json");
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn prepare_validates_before_touching_files() {
        let mut req = request("C1", "");
        req.params.blocks_file = "nope.json".into();
        let err = prepare(&req, &resolver_in(Path::new("/nonexistent"))).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingCredential)
        ));
    }

    #[test]
    fn timestamp_selects_update() {
        let mut req = request("C1", "xoxb");
        let cfg = resolve(&req, &Resolver::default()).unwrap();
        assert_eq!(cfg.action(), Action::Post { thread_ts: None });

        req.params.thread_ts = "1.1".into();
        let cfg = resolve(&req, &Resolver::default()).unwrap();
        assert_eq!(cfg.action(), Action::Post {
            thread_ts: Some("1.1")
        });

        req.params.thread_ts.clear();
        req.params.timestamp = "2.2".into();
        let cfg = resolve(&req, &Resolver::default()).unwrap();
        assert_eq!(cfg.action(), Action::Update { ts: "2.2" });
    }

    #[test]
    fn debug_output_redacts_token() {
        let cfg = resolve(&request("C1", "xoxb-secret"), &Resolver::default()).unwrap();
        assert!(!format!("{cfg:?}").contains("xoxb-secret"));
    }
}

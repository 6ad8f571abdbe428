/// Crate-wide result type for request resolution.
pub type Result<T> = std::result::Result<T, Error>;

/// A `put` request whose field combination cannot be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("bot token is a required parameter")]
    MissingCredential,

    #[error("channel is a required parameter in either source or params")]
    MissingChannel,

    #[error("blocks, blocks_file or text are required")]
    MissingContent,

    #[error("you can't provide both timestamp and thread timestamp")]
    ConflictingTimestamps,
}

/// Errors raised while turning a request into an effective configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The referenced blocks file could not be read.
    #[error("error reading blocks file '{name}': {source}")]
    FileRead {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[must_use]
    pub fn file_read(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileRead {
            name: name.into(),
            source,
        }
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error reported by a file decoder.
pub type DecodeError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// Search was called with a blank or whitespace-only term.
    #[error("search query is empty")]
    EmptyQuery,

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// No decoder is available for the file's extension.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode {name}: {source}")]
    DecodeFailure {
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("snapshot metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    IncompatibleSnapshot { found: u32, expected: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

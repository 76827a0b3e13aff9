//! Error types for playout-av.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning an output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The channel ingest protocol is not one we can demux.
    #[error("unknown ingest protocol: {0}")]
    UnknownIngest(String),

    /// The output type is not recognized at all.
    #[error("unknown output type")]
    UnknownOutputType(String),

    /// The output type is recognized but cannot be planned.
    #[error("{0} not implemented")]
    NotImplemented(String),

    /// A rendition names a codec we have no encoder for.
    #[error("rendition {index}: unknown codec: {codec}")]
    UnknownCodec { index: usize, codec: String },

    /// A rendition has unusable dimensions or bitrate.
    #[error("rendition {index}: {message}")]
    InvalidRendition { index: usize, message: String },

    /// The output has nowhere to deliver to.
    #[error("output has no destination")]
    MissingDestination,
}

impl Error {
    /// Create an invalid rendition error.
    pub fn invalid_rendition(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidRendition {
            index,
            message: message.into(),
        }
    }
}

impl From<Error> for playout_common::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::NotImplemented(kind) => playout_common::Error::NotImplemented(kind),
            other => playout_common::Error::Validation(other.to_string()),
        }
    }
}

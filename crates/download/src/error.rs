use std::fmt;

use folio_common::FromMessage;

/// Where in the per-item pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Normalizing,
    Saving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching => write!(f, "fetching"),
            Self::Normalizing => write!(f, "normalizing"),
            Self::Saving => write!(f, "saving"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The asset handle could not be resolved to bytes.
    #[error("cannot retrieve {url}: {reason}")]
    Retrieval { url: String, reason: String },

    /// The request for an asset URL did not succeed.
    #[error("fetch {url} failed: {reason}")]
    Fetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// Downloaded bytes are not a decodable image.
    #[error("decode failed: {0}")]
    Decode(#[source] folio_media::Error),

    #[error("save {filename} failed: {source}")]
    Save {
        filename: String,
        #[source]
        source: folio_common::Error,
    },

    /// A single item's pipeline failed; wraps the stage-specific cause.
    #[error("download of {filename} failed while {stage}: {source}")]
    Download {
        filename: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("nothing to download: batch is empty")]
    EmptyBatch,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub(crate) fn fetch(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            status: None,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn retrieval(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Retrieval {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Innermost cause for a [`Error::Download`], `self` otherwise.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Download { source, .. } => source.root(),
            other => other,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

folio_common::impl_context!();

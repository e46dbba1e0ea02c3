use folio_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty payload: nothing to decode")]
    Empty,
    #[error("cannot decode {declared} image: {source}")]
    Decode {
        declared: String,
        #[source]
        source: image::ImageError,
    },
    #[error("jpeg encode failed: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },
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

    /// True when the source bytes themselves were unusable, as opposed to a
    /// failure while writing the JPEG.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Empty | Self::Decode { .. })
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

folio_common::impl_context!();
